use num_traits::Float;

use crate::store::Row;

/// Possible similarity measures between rows, used to gate linkage and to rank search
/// results. Both ignore weights and compare item sets.
///
/// Empty sets follow one convention for every measure: two empty rows are identical (1.0),
/// an empty row against a non-empty one shares nothing (0.0).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SimilarityMeasure {
    /// `|A ∩ B| / min(|A|, |B|)`; a subset scores 1.0 against its superset.
    #[default]
    Overlap,
    /// `|A ∩ B| / |A ∪ B|`.
    Jaccard,
}

impl SimilarityMeasure {
    pub fn calc_sim<T: Float>(&self, a: &Row, b: &Row) -> T {
        match *self {
            Self::Overlap => overlap(a, b),
            Self::Jaccard => jaccard(a, b),
        }
    }
}

pub fn overlap<T: Float>(a: &Row, b: &Row) -> T {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => T::one(),
        (true, false) | (false, true) => T::zero(),
        (false, false) => {
            let shared = intersection_size(a, b);
            ratio(shared, a.len().min(b.len()))
        }
    }
}

pub fn jaccard<T: Float>(a: &Row, b: &Row) -> T {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => T::one(),
        (true, false) | (false, true) => T::zero(),
        (false, false) => {
            let shared = intersection_size(a, b);
            ratio(shared, a.len() + b.len() - shared)
        }
    }
}

/// Number of items two rows have in common.
pub fn intersection_size(a: &Row, b: &Row) -> usize {
    let a = a.sorted_entries();
    let b = b.sorted_entries();
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].item.cmp(&b[j].item) {
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    shared
}

fn ratio<T: Float>(numerator: usize, denominator: usize) -> T {
    T::from(numerator).unwrap_or(T::zero()) / T::from(denominator).unwrap_or(T::one())
}
