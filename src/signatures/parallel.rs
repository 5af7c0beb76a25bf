#![cfg(feature = "parallel")]
use super::RowKeys;
use crate::sampler::HashFunctions;
use crate::store::Row;
use rayon::prelude::*;

pub(crate) struct SignatureCalculatorPar<'a> {
    rows: &'a [Row],
    funcs: &'a HashFunctions,
}

impl<'a> SignatureCalculatorPar<'a> {
    pub(crate) fn new(rows: &'a [Row], funcs: &'a HashFunctions) -> Self {
        Self { rows, funcs }
    }

    /// Keys come back in row order, so folding them into a table gives the same buckets as
    /// the serial calculator.
    pub(crate) fn calc_keys(&self) -> RowKeys {
        self.rows.par_iter().map(|row| self.funcs.key_for(row)).collect()
    }
}
