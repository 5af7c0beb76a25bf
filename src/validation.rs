use crate::error::{Result, SmhError};
use crate::hyper_parameters::{LinkerParams, MinerParams, PruneParams};
use crate::store::Store;

/// Checks parameters against the store they are about to be used on. Runs before any hashing
/// happens, so a rejected call never leaves partial results behind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParamValidator<'a> {
    store: &'a Store,
}

impl<'a> ParamValidator<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub(crate) fn validate_mining(&self, params: &MinerParams) -> Result<()> {
        if params.table_size == 0 {
            return Err(SmhError::invalid("table_size", "a hash table needs at least one bucket"));
        }
        if params.tuple_size == 0 {
            return Err(SmhError::invalid("tuple_size", "tuples need at least one Min-Hash value"));
        }
        if params.number_of_tuples == 0 {
            return Err(SmhError::invalid("number_of_tuples", "at least one tuple is needed"));
        }
        let dim = self.store.dim();
        if dim > 0 && params.tuple_size > dim {
            return Err(SmhError::invalid(
                "tuple_size",
                format!("tuple size {} exceeds vocabulary size {dim}", params.tuple_size),
            ));
        }
        Ok(())
    }

    pub(crate) fn validate_linking(&self, params: &LinkerParams) -> Result<()> {
        self.validate_mining(&params.mining)?;
        validate_fraction("overlap", params.overlap)
    }

    pub(crate) fn validate_pruning(&self, params: &PruneParams, index: &Store) -> Result<()> {
        validate_fraction("overlap", params.overlap)?;
        validate_fraction("cooc_threshold", params.cooc_threshold)?;
        for candidate in self.store {
            if let Some(max) = candidate.max_item() {
                if max as usize >= index.size() {
                    return Err(SmhError::item_out_of_range(max as usize, index.size()));
                }
            }
        }
        Ok(())
    }

    /// A reference store for row expansion must list a maximum frequency for every item.
    pub(crate) fn validate_reference(&self, reference: &Store) -> Result<()> {
        if reference.size() < self.store.dim() {
            return Err(SmhError::invalid(
                "reference",
                format!(
                    "reference has {} rows, but the store has {} items",
                    reference.size(),
                    self.store.dim()
                ),
            ));
        }
        Ok(())
    }
}

fn validate_fraction(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SmhError::invalid(name, format!("{value} is not in range 0 to 1")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_mining_parameters() {
        let store = Store::new(2, 4);
        let validator = ParamValidator::new(&store);
        assert!(validator.validate_mining(&MinerParams::builder().table_size(0).build()).is_err());
        assert!(validator.validate_mining(&MinerParams::builder().tuple_size(0).build()).is_err());
        let no_tuples = MinerParams::builder().number_of_tuples(0).build();
        assert!(validator.validate_mining(&no_tuples).is_err());
        assert!(validator.validate_mining(&MinerParams::builder().tuple_size(5).build()).is_err());
        assert!(validator.validate_mining(&MinerParams::builder().tuple_size(4).build()).is_ok());
    }

    #[test]
    fn tuple_size_is_not_checked_on_empty_vocabulary() {
        let store = Store::new(0, 0);
        let validator = ParamValidator::new(&store);
        assert!(validator.validate_mining(&MinerParams::default()).is_ok());
    }

    #[test]
    fn rejects_overlap_outside_unit_range() {
        let store = Store::new(1, 4);
        let validator = ParamValidator::new(&store);
        let params = LinkerParams::builder().tuple_size(2).overlap(1.5).build();
        assert!(matches!(
            validator.validate_linking(&params),
            Err(SmhError::InvalidParameter { name: "overlap", .. })
        ));
    }

    #[test]
    fn rejects_short_reference() {
        let store = Store::new(1, 4);
        let validator = ParamValidator::new(&store);
        assert!(validator.validate_reference(&Store::new(3, 1)).is_err());
        assert!(validator.validate_reference(&Store::new(4, 1)).is_ok());
    }
}
