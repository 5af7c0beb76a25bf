use crate::error::Result;
use crate::hyper_parameters::DiscovererParams;
use crate::linker::Linker;
use crate::miner::Miner;
use crate::rng::MhRng;
use crate::sampler::SamplingBias;
use crate::store::Store;
use tracing::info;

/// Discovers groups of co-occurring items in one call: mines an inverted index, discards small
/// item sets and clusters the remaining ones into models.
///
/// # Examples
/// ```
///use smh::{Discoverer, DiscovererParams, LinkerParams, MhRng, MinerParams, SamplingBias, Store};
///
///let mut corpus = Store::new(0, 8);
///for doc in 0..6 {
///    for item in [0, 1, 2, 3] {
///        corpus.push(doc, item, 1).unwrap();
///    }
///    corpus.push(doc, 4 + (doc % 4) as u32, 1).unwrap();
///}
///let params = DiscovererParams::builder()
///    .mining(MinerParams::builder().tuple_size(2).number_of_tuples(10).table_size(1 << 8).build())
///    .linking(LinkerParams::builder().tuple_size(2).number_of_tuples(10).table_size(256).build())
///    .build();
///let models = Discoverer::new(params)
///    .fit(&corpus.invert(), SamplingBias::Uniform, &MhRng::new(1))
///    .unwrap();
///let top: Vec<u32> = models.row(0).unwrap().items().take(4).collect();
///assert_eq!(top, vec![0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discoverer {
    params: DiscovererParams,
}

impl Discoverer {
    pub fn new(params: DiscovererParams) -> Self {
        Discoverer { params }
    }

    pub fn params(&self) -> &DiscovererParams {
        &self.params
    }

    /// Mines `index` (usually an inverted index, so that rows are items), cuts off item sets
    /// smaller than `min_set_size` and clusters the rest.
    ///
    /// # Returns
    /// * The cluster models: rows of items of `index` weighted by how many mined sets they
    ///   appeared in, sorted by descending weight.
    pub fn fit(&self, index: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        let mut candidates = Miner::new(self.params.mining.clone()).mine(index, bias, rng)?;
        self.cut_off(&mut candidates);
        Linker::new(self.params.linking.clone()).cluster(&candidates, SamplingBias::Uniform, rng)
    }

    /// Same as [`Discoverer::fit`], using the parallel miner and linker.
    #[cfg(feature = "parallel")]
    pub fn fit_par(&self, index: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        let mut candidates = Miner::new(self.params.mining.clone()).mine_par(index, bias, rng)?;
        self.cut_off(&mut candidates);
        Linker::new(self.params.linking.clone())
            .cluster_par(&candidates, SamplingBias::Uniform, rng)
    }

    fn cut_off(&self, candidates: &mut Store) {
        let removed = candidates.delete_smallest(self.params.min_set_size);
        info!(
            "Kept {} item sets with at least {} items, removed {removed}",
            candidates.size(),
            self.params.min_set_size
        );
    }
}
