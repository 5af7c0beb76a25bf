//! Sparse set store: rows of weighted items over a shared vocabulary.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::error::{Result, SmhError};

/// Factor real valued weights are multiplied by before being stored as integers.
pub const WEIGHT_SCALE: f64 = 100_000_000.0;

/// Scales a real valued weight to the integer representation used by set stores.
///
/// Negative and non-finite values map to zero, values too large for `u32` saturate.
pub fn scale_weight(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let scaled = (value * WEIGHT_SCALE).round();
    if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// An item of a row together with its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    pub item: u32,
    pub weight: u32,
}

impl Entry {
    pub fn new(item: u32, weight: u32) -> Self {
        Entry { item, weight }
    }
}

/// A row of a set store. Item ids are unique within a row.
///
/// Rows are kept in ascending item order unless they have been explicitly reordered
/// (e.g. cluster models, which are sorted by descending weight).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    entries: Vec<Entry>,
    by_item: bool,
}

impl Default for Row {
    fn default() -> Self {
        Row::new()
    }
}

impl Row {
    pub fn new() -> Self {
        Row { entries: Vec::new(), by_item: true }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row { entries: Vec::with_capacity(capacity), by_item: true }
    }

    /// Builds a binary row (all weights equal to one) from item ids.
    pub fn from_items<I: IntoIterator<Item = u32>>(items: I) -> Self {
        Row::from_entries(items.into_iter().map(|item| Entry::new(item, 1)).collect())
    }

    /// Builds a row keeping the given entry order when item ids are unique. Duplicated
    /// ids are merged by adding their weights, which leaves the row in item order.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let by_item = entries.windows(2).all(|w| w[0].item < w[1].item);
        if by_item {
            return Row { entries, by_item };
        }
        let mut sorted = entries.clone();
        sorted.sort_by_key(|e| e.item);
        if sorted.windows(2).all(|w| w[0].item < w[1].item) {
            // Unique ids in a custom order
            return Row { entries, by_item: false };
        }
        let mut merged: Vec<Entry> = Vec::with_capacity(sorted.len());
        for entry in sorted {
            match merged.last_mut() {
                Some(last) if last.item == entry.item => {
                    last.weight = last.weight.saturating_add(entry.weight)
                }
                _ => merged.push(entry),
            }
        }
        Row { entries: merged, by_item: true }
    }

    /// Inserts an item keeping item order. If the item is already present its weight is
    /// increased instead.
    pub fn insert(&mut self, item: u32, weight: u32) {
        if !self.by_item {
            self.sort_by_item();
        }
        match self.entries.binary_search_by_key(&item, |e| e.item) {
            Ok(pos) => {
                let entry = &mut self.entries[pos];
                entry.weight = entry.weight.saturating_add(weight);
            }
            Err(pos) => self.entries.insert(pos, Entry::new(item, weight)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Mutable access to the entries. Callers may change weights, never item ids.
    pub(crate) fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.item)
    }

    /// Whether entries are in ascending item order.
    pub fn is_item_ordered(&self) -> bool {
        self.by_item
    }

    /// Entries in ascending item order, borrowed when the row is already ordered.
    pub fn sorted_entries(&self) -> Cow<'_, [Entry]> {
        if self.by_item {
            Cow::Borrowed(&self.entries)
        } else {
            let mut entries = self.entries.clone();
            entries.sort_by_key(|e| e.item);
            Cow::Owned(entries)
        }
    }

    pub fn weight_of(&self, item: u32) -> Option<u32> {
        if self.by_item {
            self.entries
                .binary_search_by_key(&item, |e| e.item)
                .ok()
                .map(|pos| self.entries[pos].weight)
        } else {
            self.entries.iter().find(|e| e.item == item).map(|e| e.weight)
        }
    }

    pub fn contains(&self, item: u32) -> bool {
        self.weight_of(item).is_some()
    }

    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| e.weight as u64).sum()
    }

    pub fn max_weight(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.weight).max()
    }

    pub fn max_item(&self) -> Option<u32> {
        if self.by_item {
            self.entries.last().map(|e| e.item)
        } else {
            self.entries.iter().map(|e| e.item).max()
        }
    }

    pub fn sort_by_item(&mut self) {
        self.entries.sort_by_key(|e| e.item);
        self.by_item = true;
    }

    /// Sorts entries by descending weight, ties broken by ascending item id.
    pub fn sort_by_weight(&mut self) {
        self.entries.sort_by(|a, b| match b.weight.cmp(&a.weight) {
            Ordering::Equal => a.item.cmp(&b.item),
            other => other,
        });
        self.by_item = self.entries.windows(2).all(|w| w[0].item < w[1].item);
    }

    pub fn retain<F: FnMut(&Entry) -> bool>(&mut self, f: F) {
        self.entries.retain(f);
    }
}

/// A compressed sparse row matrix with integer weights.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsrMatrix {
    pub indptr: Vec<usize>,
    pub indices: Vec<u32>,
    pub data: Vec<u32>,
    pub n_cols: usize,
}

/// A collection of rows over a vocabulary of `dim` items. The position of a row is its id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Store {
    rows: Vec<Row>,
    dim: usize,
}

impl Store {
    /// Creates a store with `size` empty rows over a vocabulary of `dim` items.
    pub fn new(size: usize, dim: usize) -> Self {
        Store { rows: vec![Row::new(); size], dim }
    }

    /// Builds a store from rows, checking every item against `dim`.
    pub fn from_rows(rows: Vec<Row>, dim: usize) -> Result<Self> {
        for row in &rows {
            if let Some(max) = row.max_item() {
                if max as usize >= dim {
                    return Err(SmhError::item_out_of_range(max as usize, dim));
                }
            }
        }
        Ok(Store { rows, dim })
    }

    /// Builds a store from rows whose items are known to lie within `dim`.
    pub(crate) fn from_rows_unchecked(rows: Vec<Row>, dim: usize) -> Self {
        Store { rows, dim }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row_id: usize) -> Option<&Row> {
        self.rows.get(row_id)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Total number of entries over all rows.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Row::len).sum()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub(crate) fn grow_dim(&mut self, dim: usize) {
        self.dim = self.dim.max(dim);
    }

    /// Adds `(item_id, weight)` to row `row_id`. A `row_id` equal to the current size
    /// appends a new row. Failed pushes leave the store unchanged.
    pub fn push(&mut self, row_id: usize, item_id: u32, weight: u32) -> Result<()> {
        if item_id as usize >= self.dim {
            return Err(SmhError::item_out_of_range(item_id as usize, self.dim));
        }
        match row_id.cmp(&self.rows.len()) {
            Ordering::Less => self.rows[row_id].insert(item_id, weight),
            Ordering::Equal => {
                let mut row = Row::new();
                row.insert(item_id, weight);
                self.rows.push(row);
            }
            Ordering::Greater => return Err(SmhError::row_out_of_range(row_id, self.rows.len())),
        }
        Ok(())
    }

    /// Appends a row and returns its id.
    pub fn push_row(&mut self, row: Row) -> Result<usize> {
        if let Some(max) = row.max_item() {
            if max as usize >= self.dim {
                return Err(SmhError::item_out_of_range(max as usize, self.dim));
            }
        }
        self.rows.push(row);
        Ok(self.rows.len() - 1)
    }

    /// Removes the last row.
    pub fn pop(&mut self) -> Option<Row> {
        self.rows.pop()
    }

    /// Removes every row with fewer than `min_size` items. Survivors keep their relative
    /// order and are renumbered contiguously. Returns the number of removed rows.
    pub fn delete_smallest(&mut self, min_size: usize) -> usize {
        self.retain_rows(|row| row.len() >= min_size)
    }

    /// Removes every row with more than `max_size` items. Returns the number of removed rows.
    pub fn delete_largest(&mut self, max_size: usize) -> usize {
        self.retain_rows(|row| row.len() <= max_size)
    }

    /// Applies [`Store::delete_smallest`] and/or [`Store::delete_largest`].
    pub fn cutoff(&mut self, min_size: Option<usize>, max_size: Option<usize>) -> usize {
        let mut removed = 0;
        if let Some(min_size) = min_size {
            removed += self.delete_smallest(min_size);
        }
        if let Some(max_size) = max_size {
            removed += self.delete_largest(max_size);
        }
        removed
    }

    pub(crate) fn retain_rows<F: FnMut(&Row) -> bool>(&mut self, f: F) -> usize {
        let before = self.rows.len();
        self.rows.retain(f);
        before - self.rows.len()
    }

    /// Sorts the entries of every row by descending weight.
    pub fn sort_rows_by_weight(&mut self) {
        self.rows.iter_mut().for_each(Row::sort_by_weight);
    }

    /// Builds the inverted index: row `i` of the result lists, in ascending order, the ids
    /// of the rows containing item `i`, weighted by the item's weight in that row.
    pub fn invert(&self) -> Store {
        let mut lengths = vec![0_usize; self.dim];
        for row in &self.rows {
            for entry in row.entries() {
                lengths[entry.item as usize] += 1;
            }
        }
        let mut inverted: Vec<Row> = lengths.into_iter().map(Row::with_capacity).collect();
        for (row_id, row) in self.rows.iter().enumerate() {
            for entry in row.entries() {
                // Row ids are visited in ascending order, so pushing keeps item order
                inverted[entry.item as usize]
                    .entries
                    .push(Entry::new(row_id as u32, entry.weight));
            }
        }
        Store { rows: inverted, dim: self.rows.len() }
    }

    /// Queries an inverted index (`self`) with a row of item ids. The result holds every
    /// id listed by the query's items, weighted by the number of query items that hit it.
    pub fn query(&self, query: &Row) -> Result<Row> {
        let mut hits: Vec<u32> = Vec::new();
        for item in query.items() {
            let posting = self
                .rows
                .get(item as usize)
                .ok_or_else(|| SmhError::item_out_of_range(item as usize, self.rows.len()))?;
            hits.extend(posting.items());
        }
        hits.sort_unstable();
        let mut result = Row::new();
        for id in hits {
            match result.entries.last_mut() {
                Some(last) if last.item == id => last.weight += 1,
                _ => result.entries.push(Entry::new(id, 1)),
            }
        }
        Ok(result)
    }

    /// Queries an inverted index with every row of `queries`.
    pub fn query_multi(&self, queries: &Store) -> Result<Store> {
        let rows = queries.iter().map(|q| self.query(q)).collect::<Result<Vec<_>>>()?;
        Ok(Store { rows, dim: self.dim })
    }

    pub fn to_csr(&self) -> CsrMatrix {
        let mut csr = CsrMatrix {
            indptr: Vec::with_capacity(self.rows.len() + 1),
            indices: Vec::with_capacity(self.nnz()),
            data: Vec::with_capacity(self.nnz()),
            n_cols: self.dim,
        };
        csr.indptr.push(0);
        for row in &self.rows {
            for entry in row.entries().iter().filter(|e| e.weight != 0) {
                csr.indices.push(entry.item);
                csr.data.push(entry.weight);
            }
            csr.indptr.push(csr.indices.len());
        }
        csr
    }

    pub fn from_csr(csr: &CsrMatrix) -> Result<Self> {
        if csr.indptr.first().copied().unwrap_or(0) != 0
            || csr.indices.len() != csr.data.len()
            || csr.indptr.last().copied().unwrap_or(0) != csr.indices.len()
            || csr.indptr.windows(2).any(|w| w[0] > w[1])
        {
            return Err(SmhError::invalid("csr", "inconsistent indptr, indices and data"));
        }
        let n_rows = csr.indptr.len().saturating_sub(1);
        let mut store = Store::new(n_rows, csr.n_cols);
        for row_id in 0..n_rows {
            for k in csr.indptr[row_id]..csr.indptr[row_id + 1] {
                if csr.data[k] != 0 {
                    store.push(row_id, csr.indices[k], csr.data[k])?;
                }
            }
        }
        Ok(store)
    }

    /// Builds a store from a dense matrix. Values are rounded to the nearest integer and
    /// zeros are not stored.
    pub fn from_dense(data: &[Vec<f64>]) -> Result<Self> {
        let dim = data.first().map_or(0, Vec::len);
        let mut store = Store::new(data.len(), dim);
        for (row_id, values) in data.iter().enumerate() {
            if values.len() != dim {
                return Err(SmhError::invalid(
                    "dense",
                    format!("row 0 has {dim} columns, but row {row_id} has {}", values.len()),
                ));
            }
            for (item, value) in values.iter().enumerate() {
                if !value.is_finite() || *value < 0.0 {
                    return Err(SmhError::invalid(
                        "dense",
                        format!("row {row_id} has a negative or non-finite value"),
                    ));
                }
                let weight = value.round();
                if weight > 0.0 {
                    store.push(row_id, item as u32, weight.min(u32::MAX as f64) as u32)?;
                }
            }
        }
        Ok(store)
    }

    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                let mut dense = vec![0.0; self.dim];
                for entry in row.entries() {
                    dense[entry.item as usize] = entry.weight as f64;
                }
                dense
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
