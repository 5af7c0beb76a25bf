use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::bucket_index::BucketIndex;
use crate::error::{Result, SmhError};
use crate::hyper_parameters::MinerParams;
#[cfg(feature = "parallel")]
use crate::miner::calc_keys_par;
use crate::miner::{calc_keys_serial, KeyCalculator, Miner};
use crate::rng::{MhRng, Purpose};
use crate::sampler::{SamplingBias, Sampler};
use crate::similarity::SimilarityMeasure;
use crate::store::{Entry, Row, Store};
use crate::validation::ParamValidator;
use tracing::info;

/// Approximate neighbour search over the rows of a store.
///
/// Unlike mining, which only keeps one table at a time, the index keeps every bucket table.
/// A query row is hashed with the same functions and meets the indexed rows it collides with.
#[derive(Debug, Clone)]
pub struct SearchIndex<'a> {
    store: &'a Store,
    sampler: Sampler<'a>,
    params: MinerParams,
    rng: MhRng,
    index: BucketIndex,
}

impl<'a> SearchIndex<'a> {
    pub fn build(
        store: &'a Store,
        params: MinerParams,
        bias: SamplingBias<'_>,
        rng: &MhRng,
    ) -> Result<Self> {
        Self::build_with(store, params, bias, rng, calc_keys_serial)
    }

    /// Same as [`SearchIndex::build`], hashing rows on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn build_par(
        store: &'a Store,
        params: MinerParams,
        bias: SamplingBias<'_>,
        rng: &MhRng,
    ) -> Result<Self> {
        Self::build_with(store, params, bias, rng, calc_keys_par)
    }

    fn build_with(
        store: &'a Store,
        params: MinerParams,
        bias: SamplingBias<'_>,
        rng: &MhRng,
        calc_keys: KeyCalculator,
    ) -> Result<Self> {
        ParamValidator::new(store).validate_mining(&params)?;
        info!(
            "Indexing {} rows in {} tables of {} buckets",
            store.size(),
            params.number_of_tuples,
            params.table_size
        );
        let sampler = Sampler::new(store, bias)?;
        let index =
            Miner::new(params.clone()).index_with(&sampler, rng, Purpose::Search, calc_keys)?;
        Ok(SearchIndex { store, sampler, params, rng: rng.clone(), index })
    }

    pub fn params(&self) -> &MinerParams {
        &self.params
    }

    pub fn tables(&self) -> &BucketIndex {
        &self.index
    }

    /// Indexed rows colliding with `row`, weighted by the number of tables they collided in.
    /// Rows are ordered by descending hits, then ascending id.
    pub fn query(&self, row: &Row) -> Result<Row> {
        let mut hits = self.hits(std::slice::from_ref(row))?;
        Ok(hits.pop().unwrap_or_default())
    }

    /// Runs [`SearchIndex::query`] for every row of `queries`.
    pub fn query_multi(&self, queries: &Store) -> Result<Store> {
        let rows = self.hits(queries.rows())?;
        Store::from_rows(rows, self.store.size())
    }

    /// Neighbours of `row` scored with `measure`, by descending similarity then ascending id.
    pub fn query_ranked(&self, row: &Row, measure: SimilarityMeasure) -> Result<Vec<(u32, f64)>> {
        let mut ranked: Vec<(u32, f64)> = self
            .query(row)?
            .items()
            .filter_map(|id| {
                let neighbour = self.store.row(id as usize)?;
                Some((id, measure.calc_sim::<f64>(row, neighbour)))
            })
            .collect();
        ranked.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => a.0.cmp(&b.0),
            Some(other) => other,
        });
        Ok(ranked)
    }

    fn hits(&self, queries: &[Row]) -> Result<Vec<Row>> {
        let prepared = queries
            .iter()
            .map(|row| self.prepare(row))
            .collect::<Result<Vec<_>>>()?;
        let mut counts: Vec<BTreeMap<u32, u32>> = vec![BTreeMap::new(); queries.len()];
        for (table, buckets) in self.index.tables().iter().enumerate() {
            let funcs = self.sampler.hash_functions(
                &self.rng,
                Purpose::Search,
                table,
                self.params.tuple_size,
                self.params.table_size,
            );
            for (query, count) in prepared.iter().zip(counts.iter_mut()) {
                let bucket = funcs.key_for(query).and_then(|key| buckets.find(key));
                for &id in bucket.map(|b| b.rows()).unwrap_or_default() {
                    *count.entry(id).or_insert(0) += 1;
                }
            }
        }
        Ok(counts
            .into_iter()
            .map(|count| {
                let entries = count.into_iter().map(|(id, hits)| Entry::new(id, hits)).collect();
                let mut row = Row::from_entries(entries);
                row.sort_by_weight();
                row
            })
            .collect())
    }

    fn prepare<'r>(&self, row: &'r Row) -> Result<Cow<'r, Row>> {
        if let Some(max) = row.max_item() {
            if max as usize >= self.store.dim() {
                return Err(SmhError::item_out_of_range(max as usize, self.store.dim()));
            }
        }
        self.sampler.prepare(row)
    }
}
