use super::RowKeys;
use crate::sampler::HashFunctions;
use crate::store::Row;

pub(crate) struct SignatureCalculator<'a> {
    rows: &'a [Row],
    funcs: &'a HashFunctions,
}

impl<'a> SignatureCalculator<'a> {
    pub(crate) fn new(rows: &'a [Row], funcs: &'a HashFunctions) -> Self {
        Self { rows, funcs }
    }

    pub(crate) fn calc_keys(&self) -> RowKeys {
        self.rows.iter().map(|row| self.funcs.key_for(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{MhRng, Purpose};
    use crate::sampler::{SamplingBias, Sampler};
    use crate::store::Store;

    #[test]
    fn one_key_per_row() {
        let mut store = Store::new(3, 5);
        for item in 0..4 {
            store.push(0, item, 1).unwrap();
            store.push(2, item, 1).unwrap();
        }
        store.push(1, 4, 1).unwrap();
        let sampler = Sampler::new(&store, SamplingBias::Uniform).unwrap();
        let funcs = sampler.hash_functions(&MhRng::new(5), Purpose::Mining, 0, 2, 32);
        let keys = SignatureCalculator::new(sampler.rows(), &funcs).calc_keys();
        assert_eq!(keys.len(), 3);
        assert!(keys[1].is_none());
        assert_eq!(keys[0], keys[2]);
        assert_eq!(super::super::count_skipped(&keys), 1);
    }
}
