use crate::error::Result;
use crate::hyper_parameters::PruneParams;
use crate::similarity::intersection_size;
use crate::store::{Row, Store};
use crate::validation::ParamValidator;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;

/// Filters mined candidates against the index they were mined from.
///
/// A candidate is a set of items. Querying the inverted index with it retrieves the rows
/// containing at least an `overlap` fraction of those items. Items that appear in fewer than a
/// `cooc_threshold` fraction of the retrieved rows are then removed, as are candidates
/// retrieving fewer than `min_hits` rows or left with fewer than `min_size` items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pruner {
    params: PruneParams,
}

impl Pruner {
    pub fn new(params: PruneParams) -> Self {
        Pruner { params }
    }

    pub fn params(&self) -> &PruneParams {
        &self.params
    }

    /// Prunes `candidates` in place. Survivors keep their relative order and are renumbered.
    ///
    /// # Returns
    /// * The number of removed candidates. An error is returned, and `candidates` left
    ///   untouched, if a candidate names an item `index` has no row for, or if a threshold is
    ///   not a fraction.
    pub fn prune(&self, candidates: &mut Store, index: &Store) -> Result<usize> {
        ParamValidator::new(candidates).validate_pruning(&self.params, index)?;
        let pruned: Vec<Option<Row>> = candidates
            .iter()
            .map(|candidate| self.prune_candidate(candidate, index))
            .collect::<Result<_>>()?;
        Ok(self.apply(candidates, pruned))
    }

    /// Same as [`Pruner::prune`], pruning candidates on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn prune_par(&self, candidates: &mut Store, index: &Store) -> Result<usize> {
        ParamValidator::new(candidates).validate_pruning(&self.params, index)?;
        let pruned: Vec<Option<Row>> = candidates
            .rows()
            .par_iter()
            .map(|candidate| self.prune_candidate(candidate, index))
            .collect::<Result<_>>()?;
        Ok(self.apply(candidates, pruned))
    }

    /// The pruned candidate, or `None` if it retrieves too few rows.
    fn prune_candidate(&self, candidate: &Row, index: &Store) -> Result<Option<Row>> {
        let retrieved = index.query(candidate)?;
        let min_count = (candidate.len() as f64 * self.params.overlap).ceil() as u32;
        let retained = Row::from_items(
            retrieved
                .entries()
                .iter()
                .filter(|hit| hit.weight >= min_count)
                .map(|hit| hit.item),
        );
        if retained.len() < self.params.min_hits {
            return Ok(None);
        }
        let min_cooc = retained.len() as f64 * self.params.cooc_threshold;
        let mut pruned = candidate.clone();
        pruned.retain(|entry| {
            index
                .row(entry.item as usize)
                .map_or(false, |posting| intersection_size(posting, &retained) as f64 >= min_cooc)
        });
        Ok(Some(pruned))
    }

    fn apply(&self, candidates: &mut Store, pruned: Vec<Option<Row>>) -> usize {
        let before = candidates.size();
        let mut keep = Vec::with_capacity(pruned.len());
        for (slot, row) in candidates.rows_mut().iter_mut().zip(pruned) {
            keep.push(row.is_some());
            if let Some(row) = row {
                *slot = row;
            }
        }
        let mut keep = keep.into_iter();
        candidates.retain_rows(|_| keep.next().unwrap_or(false));
        candidates.delete_smallest(self.params.min_size);
        let removed = before - candidates.size();
        info!("Pruning removed {removed} of {before} candidates");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmhError;

    fn inverted_index() -> Store {
        let mut corpus = Store::new(0, 5);
        let docs = [vec![0, 1, 2], vec![0, 1, 2], vec![0, 1, 3], vec![3, 4]];
        for (doc, items) in docs.iter().enumerate() {
            for &item in items {
                corpus.push(doc, item, 1).unwrap();
            }
        }
        corpus.invert()
    }

    fn candidates() -> Store {
        let rows = vec![
            Row::from_items([0, 1, 2, 4]),
            Row::from_items([3, 4]),
            Row::from_items([2, 3]),
        ];
        Store::from_rows(rows, 5).unwrap()
    }

    #[test]
    fn prune_keeps_coherent_items() {
        let index = inverted_index();
        let mut candidates = candidates();
        let removed = Pruner::default().prune(&mut candidates, &index).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(candidates.size(), 1);
        assert_eq!(candidates.row(0).unwrap().items().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn small_candidates_survive_lower_min_size() {
        let index = inverted_index();
        let mut candidates = candidates();
        let pruner = Pruner::new(PruneParams::builder().min_size(2).build());
        assert_eq!(pruner.prune(&mut candidates, &index).unwrap(), 1);
        assert_eq!(candidates.row(1).unwrap().items().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn unknown_items_leave_candidates_untouched() {
        let index = inverted_index();
        let mut candidates = Store::from_rows(vec![Row::from_items([1, 7])], 8).unwrap();
        let before = candidates.clone();
        assert!(matches!(
            Pruner::default().prune(&mut candidates, &index),
            Err(SmhError::OutOfRange { index: 7, .. })
        ));
        assert_eq!(candidates, before);
    }
}
