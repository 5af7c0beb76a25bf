use num_traits::Float;

use crate::error::{Result, SmhError};
use crate::store::{scale_weight, Store};

/// Per-item weights used to bias Min-Hash sampling. Higher weights make an item more likely
/// to be selected into a tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    values: Vec<f64>,
}

impl Weights {
    /// Neutral weights (all equal to one) for a vocabulary of `dim` items.
    pub fn uniform(dim: usize) -> Self {
        Weights { values: vec![1.0; dim] }
    }

    pub fn from_vec(values: Vec<f64>) -> Result<Self> {
        if let Some(item) = values.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(SmhError::invalid(
                "weights",
                format!("weight of item {item} is negative or not finite"),
            ));
        }
        Ok(Weights { values })
    }

    /// Wraps values taken from existing weights.
    pub(crate) fn from_checked(values: Vec<f64>) -> Self {
        Weights { values }
    }

    /// Computes one weight per item of an inverted index, using the posting list of the item
    /// as its occurrences. `corpus_size` is the number of rows the index was built from.
    pub fn from_inverted(index: &Store, corpus_size: usize, scheme: WeightScheme) -> Self {
        let values = index
            .iter()
            .map(|posting| {
                if posting.is_empty() {
                    0.0
                } else {
                    let tf = posting.total_weight() as f64;
                    scheme.calc_weight::<f64>(tf, posting.len(), corpus_size).max(0.0)
                }
            })
            .collect();
        Weights { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Weight of `item`; items beyond the stored range are neutral.
    pub fn get(&self, item: usize) -> f64 {
        self.values.get(item).copied().unwrap_or(1.0)
    }

    pub fn set(&mut self, item: usize, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SmhError::invalid(
                "weights",
                format!("weight {weight} of item {item} is negative or not finite"),
            ));
        }
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(item)
            .ok_or_else(|| SmhError::item_out_of_range(item, len))?;
        *slot = weight;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Weights for a vocabulary of `dim` items, padding with neutral weights.
    pub(crate) fn dense(&self, dim: usize) -> Vec<f64> {
        (0..dim).map(|item| self.get(item)).collect()
    }
}

/// Term weighting schemes used to derive item weights from an inverted index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WeightScheme {
    /// Raw occurrence count.
    TermFrequency,
    /// `ln(tf + 1)`.
    LogTermFrequency,
    /// Presence only; every item gets the same small weight.
    Binary,
    /// `ln(N / df)`.
    InverseDocumentFrequency,
    /// `tf * ln(N / df)`.
    TfIdf,
}

const BINARY_WEIGHT: f64 = 1e-9;

impl WeightScheme {
    pub fn calc_weight<T: Float>(&self, tf: T, df: usize, corpus_size: usize) -> T {
        let idf = || {
            if df == 0 {
                T::zero()
            } else {
                (T::from(corpus_size).unwrap_or(T::zero()) / T::from(df).unwrap_or(T::one())).ln()
            }
        };
        match *self {
            Self::TermFrequency => tf,
            Self::LogTermFrequency => (tf + T::one()).ln(),
            Self::Binary => T::from(BINARY_WEIGHT).unwrap_or(T::epsilon()),
            Self::InverseDocumentFrequency => idf(),
            Self::TfIdf => tf * idf(),
        }
    }
}

/// Rewrites the weights of an inverted index with a weighting scheme, stored as scaled
/// integers. Weights never drop to zero so that every posting stays visible.
pub fn weight_index(index: &mut Store, corpus_size: usize, scheme: WeightScheme) {
    for posting in index.rows_mut() {
        let df = posting.len();
        for entry in posting.entries_mut() {
            let weight = scheme.calc_weight(entry.weight as f64, df, corpus_size);
            entry.weight = scale_weight(weight).max(1);
        }
    }
}
