use crate::sampler::TupleKey;

#[cfg(feature = "parallel")]
pub(crate) mod parallel;
pub(crate) mod serial;

/// Composite keys of every row for one hash table. `None` marks rows too short to draw a
/// tuple from.
pub(crate) type RowKeys = Vec<Option<TupleKey>>;

pub(crate) fn count_skipped(keys: &RowKeys) -> usize {
    keys.iter().filter(|key| key.is_none()).count()
}
