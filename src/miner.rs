#[cfg(feature = "parallel")]
use crate::signatures::parallel::SignatureCalculatorPar;
use crate::bucket_index::{BucketIndex, BucketTable};
use crate::error::Result;
use crate::hyper_parameters::MinerParams;
use crate::rng::{MhRng, Purpose};
use crate::sampler::{HashFunctions, Sampler, SamplingBias};
use crate::signatures::serial::SignatureCalculator;
use crate::signatures::{count_skipped, RowKeys};
use crate::store::{Row, Store};
use crate::validation::ParamValidator;
use tracing::{debug, info};

/// Computes the keys of every row for one table.
pub(crate) type KeyCalculator = fn(&[Row], &HashFunctions) -> RowKeys;

pub(crate) fn calc_keys_serial(rows: &[Row], funcs: &HashFunctions) -> RowKeys {
    SignatureCalculator::new(rows, funcs).calc_keys()
}

#[cfg(feature = "parallel")]
pub(crate) fn calc_keys_par(rows: &[Row], funcs: &HashFunctions) -> RowKeys {
    SignatureCalculatorPar::new(rows, funcs).calc_keys()
}

/// Sampled Min-Hashing: finds groups of rows that collide in at least one of many
/// independent Min-Hash tables.
///
/// Applied to an inverted index (see [`Store::invert`]), the rows are items and every
/// candidate is a set of items that frequently co-occur in the original store.
///
/// # Examples
/// ```
///use smh::{Miner, MinerParams, MhRng, SamplingBias, Store};
///
///let mut store = Store::new(0, 6);
///for row in 0..4 {
///    for item in 0..4 {
///        store.push(row, item, 1).unwrap();
///    }
///}
///store.push(4, 5, 1).unwrap();
///let params = MinerParams::builder()
///    .tuple_size(2)
///    .number_of_tuples(5)
///    .table_size(1 << 10)
///    .build();
///let candidates = Miner::new(params).mine(&store, SamplingBias::Uniform, &MhRng::new(7)).unwrap();
///assert_eq!(candidates.size(), 5);
///assert!(candidates.iter().all(|c| c.items().collect::<Vec<_>>() == vec![0, 1, 2, 3]));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Miner {
    params: MinerParams,
}

impl Miner {
    pub fn new(params: MinerParams) -> Self {
        Miner { params }
    }

    pub fn params(&self) -> &MinerParams {
        &self.params
    }

    /// Mines `store`.
    ///
    /// # Returns
    /// * A store with one row per table and bucket holding at least two rows, in table order
    ///   and then in the order buckets were first used. Its items are the ids of the colliding
    ///   rows (weight one) and its vocabulary is the size of `store`. An error is returned if
    ///   the parameters are degenerate, or if a hash table fills up.
    pub fn mine(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        self.mine_with(store, bias, rng, Purpose::Mining, calc_keys_serial)
    }

    /// Same as [`Miner::mine`], computing row signatures on the rayon thread pool. Results are
    /// identical to the serial ones.
    #[cfg(feature = "parallel")]
    pub fn mine_par(&self, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
        self.mine_with(store, bias, rng, Purpose::Mining, calc_keys_par)
    }

    pub(crate) fn mine_with(
        &self,
        store: &Store,
        bias: SamplingBias<'_>,
        rng: &MhRng,
        purpose: Purpose,
        calc_keys: KeyCalculator,
    ) -> Result<Store> {
        ParamValidator::new(store).validate_mining(&self.params)?;
        let mut candidates = Store::new(0, store.size());
        if store.is_empty() {
            return Ok(candidates);
        }
        info!(
            "Mining {} rows over {} items: tuple size {}, {} tuples, table size {}",
            store.size(),
            store.dim(),
            self.params.tuple_size,
            self.params.number_of_tuples,
            self.params.table_size
        );
        let sampler = Sampler::new(store, bias)?;
        for table in 0..self.params.number_of_tuples {
            let bucket_table = self.hash_table(&sampler, rng, purpose, table, calc_keys)?;
            for bucket in bucket_table.buckets().filter(|bucket| bucket.len() >= 2) {
                candidates.push_row(Row::from_items(bucket.rows().iter().copied()))?;
            }
        }
        info!("Mined {} candidates", candidates.size());
        Ok(candidates)
    }

    /// Hashes every row once per table and keeps all tables.
    pub(crate) fn index_with(
        &self,
        sampler: &Sampler<'_>,
        rng: &MhRng,
        purpose: Purpose,
        calc_keys: KeyCalculator,
    ) -> Result<BucketIndex> {
        let mut index = BucketIndex::new();
        for table in 0..self.params.number_of_tuples {
            index.push(self.hash_table(sampler, rng, purpose, table, calc_keys)?);
        }
        Ok(index)
    }

    fn hash_table(
        &self,
        sampler: &Sampler<'_>,
        rng: &MhRng,
        purpose: Purpose,
        table: usize,
        calc_keys: KeyCalculator,
    ) -> Result<BucketTable> {
        let funcs = sampler.hash_functions(
            rng,
            purpose,
            table,
            self.params.tuple_size,
            self.params.table_size,
        );
        let keys = calc_keys(sampler.rows(), &funcs);
        let bucket_table = BucketTable::from_keys(self.params.table_size, &keys)?;
        debug!(
            "Table {table}: {} buckets used, {} rows too short to hash",
            bucket_table.used_buckets(),
            count_skipped(&keys)
        );
        Ok(bucket_table)
    }
}

/// Number of candidates containing both `a` and `b`, i.e. the number of tables in which the
/// two rows collided.
pub fn significance(candidates: &Store, a: u32, b: u32) -> usize {
    candidates
        .iter()
        .filter(|candidate| candidate.contains(a) && candidate.contains(b))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmhError;

    fn duplicated_rows() -> Store {
        let mut store = Store::new(0, 8);
        for row in 0..3 {
            for item in [1, 3, 5] {
                store.push(row, item, 1).unwrap();
            }
        }
        for item in [0, 2, 4, 6] {
            store.push(3, item, 1).unwrap();
        }
        store.push(4, 7, 1).unwrap();
        store
    }

    fn miner(number_of_tuples: usize) -> Miner {
        Miner::new(
            MinerParams::builder()
                .tuple_size(2)
                .number_of_tuples(number_of_tuples)
                .table_size(64)
                .build(),
        )
    }

    #[test]
    fn identical_rows_collide_in_every_table() {
        let store = duplicated_rows();
        let candidates = miner(10).mine(&store, SamplingBias::Uniform, &MhRng::new(1)).unwrap();
        assert_eq!(candidates.dim(), store.size());
        assert!(candidates.size() >= 10);
        assert_eq!(significance(&candidates, 0, 2), 10);
        assert_eq!(significance(&candidates, 3, 4), 0);
        assert!(candidates.iter().all(|c| c.len() >= 2));
    }

    #[test]
    fn empty_store_mines_nothing() {
        let store = Store::new(0, 0);
        let candidates = miner(3).mine(&store, SamplingBias::Uniform, &MhRng::new(1)).unwrap();
        assert_eq!(candidates.size(), 0);
    }

    #[test]
    fn degenerate_parameters_are_rejected() {
        let store = duplicated_rows();
        let params = MinerParams::builder().table_size(0).build();
        assert!(matches!(
            Miner::new(params).mine(&store, SamplingBias::Uniform, &MhRng::new(1)),
            Err(SmhError::InvalidParameter { name: "table_size", .. })
        ));
    }

    #[test]
    fn mining_is_reproducible() {
        let store = duplicated_rows();
        let a = miner(6).mine(&store, SamplingBias::Uniform, &MhRng::new(11)).unwrap();
        let b = miner(6).mine(&store, SamplingBias::Uniform, &MhRng::new(11)).unwrap();
        assert_eq!(a, b);
    }
}
