//! Min-Hash sampling of rows into composite keys, optionally biased by item weights or by
//! row expansion.

use std::borrow::Cow;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, SmhError};
use crate::rng::{MhRng, Purpose};
use crate::store::{Row, Store};
use crate::validation::ParamValidator;
use crate::weights::Weights;

/// Largest prime below 2^64, modulus of the universal hash functions.
pub const PRIME: u64 = 18_446_744_073_709_551_557;

/// How items are favoured when a Min-Hash value is drawn from a row.
///
/// Weighting and expansion lead to the same selection probabilities: an item is picked in
/// proportion to its weight (or to its replicated count). Weighting keeps the store as is and
/// divides the exponential ranks; expansion materializes a larger binary store for the duration
/// of the call and hashes it uniformly. The choice is a memory versus speed trade-off only.
#[derive(Debug, Clone, Copy, Default)]
pub enum SamplingBias<'a> {
    /// Every item of a row is equally likely to be selected.
    #[default]
    Uniform,
    /// Items are selected in proportion to their weight.
    Weighted(&'a Weights),
    /// Each item is replicated as many times as its count in the row, capped by its maximum
    /// frequency in `reference` (row `i` of `reference` lists the occurrences of item `i`,
    /// e.g. the inverted index of the store).
    Expanded {
        reference: &'a Store,
        weights: Option<&'a Weights>,
    },
}

/// Maps items to consecutive ranges of expanded ids, one id per possible occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    offsets: Vec<usize>,
}

impl Expansion {
    /// Computes the cumulative maximum frequencies of every item listed by `reference`.
    pub fn new(reference: &Store) -> Result<Self> {
        let mut offsets = Vec::with_capacity(reference.size() + 1);
        let mut total = 0_usize;
        offsets.push(total);
        for row in reference {
            total = total.saturating_add(row.max_weight().unwrap_or(0) as usize);
            offsets.push(total);
        }
        if total > u32::MAX as usize {
            return Err(SmhError::invalid(
                "reference",
                format!("expansion would need {total} item ids"),
            ));
        }
        Ok(Expansion { offsets })
    }

    /// Number of items covered by the expansion.
    pub fn items(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Size of the expanded vocabulary.
    pub fn dim(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn max_frequency(&self, item: u32) -> usize {
        let item = item as usize;
        match (self.offsets.get(item), self.offsets.get(item + 1)) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    /// Replaces every item of weight `c` by `min(c, max_frequency)` consecutive expanded ids
    /// with weight one.
    pub fn expand_row(&self, row: &Row) -> Result<Row> {
        let mut expanded = Vec::with_capacity(row.len());
        for entry in row.sorted_entries().iter() {
            let item = entry.item as usize;
            if item >= self.items() {
                return Err(SmhError::item_out_of_range(item, self.items()));
            }
            let copies = (entry.weight as usize).min(self.max_frequency(entry.item));
            let start = self.offsets[item];
            expanded.extend((start..start + copies).map(|id| id as u32));
        }
        Ok(Row::from_items(expanded))
    }

    pub fn expand_store(&self, store: &Store) -> Result<Store> {
        let rows = store.iter().map(|row| self.expand_row(row)).collect::<Result<Vec<_>>>()?;
        Store::from_rows(rows, self.dim())
    }

    /// Gives every expanded id the weight of the item it stands for.
    pub fn expand_weights(&self, weights: &Weights) -> Weights {
        let mut values = Vec::with_capacity(self.dim());
        for (item, bounds) in self.offsets.windows(2).enumerate() {
            values.extend(std::iter::repeat(weights.get(item)).take(bounds[1] - bounds[0]));
        }
        Weights::from_checked(values)
    }

    /// The item an expanded id stands for.
    pub fn original_item(&self, expanded: u32) -> u32 {
        let expanded = expanded as usize;
        (self.offsets.partition_point(|&offset| offset <= expanded).saturating_sub(1)) as u32
    }
}

/// Position of a Min-Hash tuple in a hash table: the bucket probing starts from and the
/// fingerprint identifying the tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleKey {
    pub home: usize,
    pub fingerprint: u64,
}

/// The random functions of one hash table: `tuple_size` rankings of the vocabulary and the
/// universal hash coefficients combining the selected items into a [`TupleKey`].
#[derive(Debug, Clone)]
pub struct HashFunctions {
    tuple_size: usize,
    dim: usize,
    table_size: usize,
    a: Vec<u64>,
    b: Vec<u64>,
    ranks: Vec<f64>,
}

impl HashFunctions {
    /// Draws, in order, `tuple_size` coefficient pairs and `tuple_size * dim` exponential
    /// ranks from `rng`. Ranks are divided by item weights when given.
    pub(crate) fn generate(
        rng: &mut ChaCha8Rng,
        tuple_size: usize,
        dim: usize,
        table_size: usize,
        weights: Option<&[f64]>,
    ) -> Self {
        let mut a = Vec::with_capacity(tuple_size);
        let mut b = Vec::with_capacity(tuple_size);
        for _ in 0..tuple_size {
            a.push(rng.gen_range(1..PRIME));
            b.push(rng.gen_range(1..PRIME));
        }
        let mut ranks = Vec::with_capacity(tuple_size * dim);
        for _ in 0..tuple_size {
            for item in 0..dim {
                let rank = exponential(rng.gen::<u64>());
                let weight = weights.and_then(|w| w.get(item).copied()).unwrap_or(1.0);
                ranks.push(if weight > 0.0 { rank / weight } else { f64::INFINITY });
            }
        }
        HashFunctions { tuple_size, dim, table_size, a, b, ranks }
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Selects, for each function, the item of `row` with the smallest rank. Ties go to the
    /// lower item id. Rows with fewer than `tuple_size` items have no tuple.
    pub fn select(&self, row: &Row) -> Option<Vec<u32>> {
        if row.len() < self.tuple_size || row.is_empty() {
            return None;
        }
        let entries = row.sorted_entries();
        let tuple = (0..self.tuple_size)
            .map(|f| {
                let ranks = &self.ranks[f * self.dim..(f + 1) * self.dim];
                let mut best = entries[0].item;
                let mut best_rank = rank_of(ranks, best);
                for entry in entries.iter().skip(1) {
                    let rank = rank_of(ranks, entry.item);
                    if rank < best_rank {
                        best = entry.item;
                        best_rank = rank;
                    }
                }
                best
            })
            .collect();
        Some(tuple)
    }

    /// Universal hash of a tuple of items.
    pub fn key(&self, tuple: &[u32]) -> TupleKey {
        let mut home = 0_u128;
        let mut fingerprint = 0_u128;
        let prime = PRIME as u128;
        for ((&item, &a), &b) in tuple.iter().zip(&self.a).zip(&self.b) {
            let value = item as u128 + 1;
            home = (home + (a as u128 * value) % prime) % prime;
            fingerprint = (fingerprint + (b as u128 * value) % prime) % prime;
        }
        TupleKey {
            home: (home % self.table_size as u128) as usize,
            fingerprint: fingerprint as u64,
        }
    }

    pub fn key_for(&self, row: &Row) -> Option<TupleKey> {
        self.select(row).map(|tuple| self.key(&tuple))
    }
}

fn rank_of(ranks: &[f64], item: u32) -> f64 {
    ranks.get(item as usize).copied().unwrap_or(f64::INFINITY)
}

/// Maps 64 random bits to an Exp(1) draw. Uses the upper 52 bits as a uniform value in the
/// open interval (0, 1); the top draw stays strictly below one.
fn exponential(bits: u64) -> f64 {
    let uniform = ((bits >> 12) as f64 + 0.5) * (1.0 / (1_u64 << 52) as f64);
    -uniform.ln()
}

/// Draws Min-Hash tuples from the rows of a store under a [`SamplingBias`].
#[derive(Debug, Clone)]
pub struct Sampler<'a> {
    source: Cow<'a, Store>,
    weights: Option<Vec<f64>>,
    expansion: Option<Expansion>,
}

impl<'a> Sampler<'a> {
    pub fn new(store: &'a Store, bias: SamplingBias<'_>) -> Result<Self> {
        match bias {
            SamplingBias::Uniform => Ok(Sampler {
                source: Cow::Borrowed(store),
                weights: None,
                expansion: None,
            }),
            SamplingBias::Weighted(weights) => Ok(Sampler {
                source: Cow::Borrowed(store),
                weights: Some(weights.dense(store.dim())),
                expansion: None,
            }),
            SamplingBias::Expanded { reference, weights } => {
                ParamValidator::new(store).validate_reference(reference)?;
                let expansion = Expansion::new(reference)?;
                let expanded = expansion.expand_store(store)?;
                let weights = weights.map(|w| expansion.expand_weights(w).dense(expansion.dim()));
                Ok(Sampler {
                    source: Cow::Owned(expanded),
                    weights,
                    expansion: Some(expansion),
                })
            }
        }
    }

    /// Vocabulary size of the sampled rows (the expanded one under expansion).
    pub fn dim(&self) -> usize {
        self.source.dim()
    }

    pub fn size(&self) -> usize {
        self.source.size()
    }

    pub(crate) fn rows(&self) -> &[Row] {
        self.source.rows()
    }

    pub fn is_expanded(&self) -> bool {
        self.expansion.is_some()
    }

    /// Random functions of hash table `table`, drawn from its own substream.
    pub fn hash_functions(
        &self,
        rng: &MhRng,
        purpose: Purpose,
        table: usize,
        tuple_size: usize,
        table_size: usize,
    ) -> HashFunctions {
        let mut stream = rng.stream(purpose, table);
        let weights = self.weights.as_deref();
        HashFunctions::generate(&mut stream, tuple_size, self.dim(), table_size, weights)
    }

    /// The items selected for row `row_id`, as ids of the original vocabulary.
    pub fn sample(&self, funcs: &HashFunctions, row_id: usize) -> Option<Vec<u32>> {
        let tuple = funcs.select(self.source.row(row_id)?)?;
        Some(match &self.expansion {
            Some(expansion) => tuple.into_iter().map(|e| expansion.original_item(e)).collect(),
            None => tuple,
        })
    }

    pub fn key(&self, funcs: &HashFunctions, row_id: usize) -> Option<TupleKey> {
        funcs.key_for(self.source.row(row_id)?)
    }

    /// Brings an outside row into the sampled vocabulary.
    pub(crate) fn prepare<'r>(&self, row: &'r Row) -> Result<Cow<'r, Row>> {
        match &self.expansion {
            Some(expansion) => Ok(Cow::Owned(expansion.expand_row(row)?)),
            None => Ok(Cow::Borrowed(row)),
        }
    }
}
