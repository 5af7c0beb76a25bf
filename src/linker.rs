use std::collections::BTreeMap;

use crate::error::Result;
use crate::hyper_parameters::{validate_input_left_bound, LinkerParams};
#[cfg(feature = "parallel")]
use crate::miner::calc_keys_par;
use crate::miner::{calc_keys_serial, KeyCalculator, Miner};
use crate::rng::{MhRng, Purpose};
use crate::sampler::SamplingBias;
use crate::store::{Entry, Row, Store};
use crate::union_find::UnionFind;
use crate::validation::ParamValidator;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;

/// Result of linking the rows of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linkage {
    /// One row per cluster, listing the ids of its member rows. Clusters are ordered by their
    /// lowest member id.
    pub clusters: Store,
    /// Cluster of every row of the linked store, -1 for rows that belong to no cluster.
    pub labels: Vec<i32>,
}

/// Min-Hash accelerated single-link clustering.
///
/// Rows are re-mined with the linker's own parameters. Two rows sharing a bucket are linked
/// when their similarity reaches the overlap threshold, and linked rows are merged
/// transitively. Groups with at least `min_cluster_size` rows become clusters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Linker {
    params: LinkerParams,
}

impl Linker {
    pub fn new(params: LinkerParams) -> Self {
        Linker { params }
    }

    pub fn params(&self) -> &LinkerParams {
        &self.params
    }

    /// Links the rows of `store`.
    ///
    /// # Returns
    /// * The clusters as rows of member ids, and one label per row of `store`. An error is
    ///   returned if the parameters are degenerate or if a hash table fills up.
    pub fn link(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Linkage> {
        ParamValidator::new(store).validate_linking(&self.params)?;
        if store.is_empty() {
            return Ok(empty_linkage());
        }
        let buckets = self.collide(store, bias, rng, calc_keys_serial)?;
        let mut uf = UnionFind::new(store.size());
        for bucket in &buckets {
            let members: Vec<usize> = bucket.items().map(|id| id as usize).collect();
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    if uf.find(a) != uf.find(b) && self.is_link(store, a, b) {
                        uf.union(a, b);
                    }
                }
            }
        }
        Ok(self.label(&mut uf, store.size()))
    }

    /// Same as [`Linker::link`], hashing rows and scoring the pairs of each bucket on the rayon
    /// thread pool. Unions are applied in bucket order, giving the serial result.
    #[cfg(feature = "parallel")]
    pub fn link_par(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Linkage> {
        ParamValidator::new(store).validate_linking(&self.params)?;
        if store.is_empty() {
            return Ok(empty_linkage());
        }
        let buckets = self.collide(store, bias, rng, calc_keys_par)?;
        let links: Vec<Vec<(usize, usize)>> = buckets
            .rows()
            .par_iter()
            .map(|bucket| {
                let members: Vec<usize> = bucket.items().map(|id| id as usize).collect();
                let mut links = Vec::new();
                for (i, &a) in members.iter().enumerate() {
                    for &b in &members[i + 1..] {
                        if self.is_link(store, a, b) {
                            links.push((a, b));
                        }
                    }
                }
                links
            })
            .collect();
        let mut uf = UnionFind::new(store.size());
        for (a, b) in links.into_iter().flatten() {
            uf.union(a, b);
        }
        Ok(self.label(&mut uf, store.size()))
    }

    /// Links the rows of `store` and aggregates every cluster into a model row.
    ///
    /// # Returns
    /// * A store with one row per cluster holding the summed item weights of its members,
    ///   sorted by descending weight.
    pub fn cluster(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        let linkage = self.link(store, bias, rng)?;
        Ok(make_model(store, &linkage.clusters, self.params.min_cluster_size))
    }

    #[cfg(feature = "parallel")]
    pub fn cluster_par(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        let linkage = self.link_par(store, bias, rng)?;
        Ok(make_model(store, &linkage.clusters, self.params.min_cluster_size))
    }

    fn collide(
        &self,
        store: &Store,
        bias: SamplingBias<'_>,
        rng: &MhRng,
        calc_keys: KeyCalculator,
    ) -> Result<Store> {
        info!(
            "Linking {} rows: overlap {}, min cluster size {}",
            store.size(),
            self.params.overlap,
            self.params.min_cluster_size
        );
        Miner::new(self.params.mining.clone()).mine_with(
            store,
            bias,
            rng,
            Purpose::Linking,
            calc_keys,
        )
    }

    fn is_link(&self, store: &Store, a: usize, b: usize) -> bool {
        match (store.row(a), store.row(b)) {
            (Some(row_a), Some(row_b)) => {
                self.params.measure.calc_sim::<f64>(row_a, row_b) >= self.params.overlap
            }
            _ => false,
        }
    }

    fn label(&self, uf: &mut UnionFind, n_samples: usize) -> Linkage {
        let mut cluster_of_root: BTreeMap<usize, usize> = BTreeMap::new();
        let mut members: Vec<Vec<u32>> = Vec::new();
        let mut labels = vec![-1; n_samples];
        for (row_id, label) in labels.iter_mut().enumerate() {
            let root = uf.find(row_id);
            if uf.size_of(root) < self.params.min_cluster_size {
                continue;
            }
            let cluster = *cluster_of_root.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[cluster].push(row_id as u32);
            *label = cluster as i32;
        }
        let rows = members.into_iter().map(Row::from_items).collect();
        let clusters = Store::from_rows_unchecked(rows, n_samples);
        info!("Found {} clusters", clusters.size());
        Linkage { clusters, labels }
    }
}

fn empty_linkage() -> Linkage {
    Linkage { clusters: Store::new(0, 0), labels: Vec::new() }
}

/// Aggregates clusters of rows into model rows.
///
/// Row `k` of the result holds every item of the members of cluster `k`, weighted by the sum
/// of their weights and sorted by descending weight (ties by ascending item). Members that are
/// out of range or empty in `store` are ignored, and clusters left with fewer than
/// `min_cluster_size` members are dropped.
pub fn make_model(store: &Store, clusters: &Store, min_cluster_size: usize) -> Store {
    let min_cluster_size = validate_input_left_bound(min_cluster_size, 1, "min_cluster_size");
    let mut rows = Vec::new();
    for cluster in clusters {
        let mut weights: BTreeMap<u32, u32> = BTreeMap::new();
        let mut n_members = 0;
        for member in cluster.items() {
            let row = match store.row(member as usize) {
                Some(row) if !row.is_empty() => row,
                _ => continue,
            };
            n_members += 1;
            for entry in row.entries() {
                let weight = weights.entry(entry.item).or_insert(0);
                *weight = weight.saturating_add(entry.weight);
            }
        }
        if n_members < min_cluster_size {
            continue;
        }
        let entries = weights.into_iter().map(|(item, w)| Entry::new(item, w)).collect();
        let mut row = Row::from_entries(entries);
        row.sort_by_weight();
        rows.push(row);
    }
    Store::from_rows_unchecked(rows, store.dim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityMeasure;

    fn linker(min_cluster_size: usize) -> Linker {
        Linker::new(
            LinkerParams::builder()
                .tuple_size(2)
                .number_of_tuples(20)
                .table_size(1 << 10)
                .min_cluster_size(min_cluster_size)
                .build(),
        )
    }

    fn two_groups() -> Store {
        let mut store = Store::new(0, 20);
        for row in 0..4 {
            for item in 0..5 {
                store.push(row, item, 1).unwrap();
            }
        }
        for row in 4..7 {
            for item in 10..14 {
                store.push(row, item, 2).unwrap();
            }
        }
        store.push(7, 19, 1).unwrap();
        store
    }

    #[test]
    fn identical_rows_form_clusters() {
        let store = two_groups();
        let linkage = linker(3).link(&store, SamplingBias::Uniform, &MhRng::new(4)).unwrap();
        assert_eq!(linkage.labels, vec![0, 0, 0, 0, 1, 1, 1, -1]);
        assert_eq!(linkage.clusters.row(1).unwrap().items().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn small_groups_are_discarded() {
        let store = two_groups();
        let linkage = linker(4).link(&store, SamplingBias::Uniform, &MhRng::new(4)).unwrap();
        assert_eq!(linkage.labels, vec![0, 0, 0, 0, -1, -1, -1, -1]);
        assert_eq!(linkage.clusters.size(), 1);
    }

    #[test]
    fn models_sum_member_weights() {
        let store = two_groups();
        let model = linker(3).cluster(&store, SamplingBias::Uniform, &MhRng::new(4)).unwrap();
        assert_eq!(model.size(), 2);
        assert_eq!(model.row(1).unwrap().entries()[0], Entry::new(10, 6));
        assert_eq!(model.row(0).unwrap().items().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn make_model_skips_invalid_members() {
        let store = two_groups();
        let mut with_empty = store.clone();
        with_empty.push_row(Row::new()).unwrap();
        let clusters = Store::from_rows(vec![Row::from_items([4, 5, 8, 30])], 40).unwrap();
        assert_eq!(make_model(&with_empty, &clusters, 3).size(), 0);
        let model = make_model(&with_empty, &clusters, 2);
        assert_eq!(model.row(0).unwrap().weight_of(12), Some(4));
    }

    #[test]
    fn jaccard_is_stricter_than_overlap() {
        let mut store = Store::new(0, 10);
        for row in 0..3 {
            for item in 0..3 {
                store.push(row, item, 1).unwrap();
            }
        }
        for item in 0..9 {
            store.push(3, item, 1).unwrap();
        }
        let params = LinkerParams::builder()
            .tuple_size(1)
            .number_of_tuples(50)
            .table_size(1 << 8)
            .min_cluster_size(4);
        let rng = MhRng::new(8);
        let overlap = Linker::new(params.clone().build())
            .link(&store, SamplingBias::Uniform, &rng)
            .unwrap();
        assert_eq!(overlap.labels, vec![0, 0, 0, 0]);
        let jaccard = Linker::new(params.measure(SimilarityMeasure::Jaccard).build())
            .link(&store, SamplingBias::Uniform, &rng)
            .unwrap();
        assert_eq!(jaccard.labels, vec![-1, -1, -1, -1]);
    }

    #[test]
    fn empty_store_links_nothing() {
        let linkage = Linker::default()
            .link(&Store::new(0, 0), SamplingBias::Uniform, &MhRng::new(1))
            .unwrap();
        assert!(linkage.labels.is_empty());
        assert_eq!(linkage.clusters.size(), 0);
    }
}
