use std::collections::HashMap;

use crate::error::{Result, SmhError};
use crate::sampler::TupleKey;
use crate::signatures::RowKeys;

/// Rows whose tuples hashed to the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    fingerprint: u64,
    rows: Vec<u32>,
}

impl Bucket {
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Row ids in insertion order.
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An open addressing hash table with linear probing. Only occupied buckets are allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    table_size: usize,
    slots: HashMap<usize, Bucket>,
    used: Vec<usize>,
}

impl BucketTable {
    pub fn new(table_size: usize) -> Self {
        BucketTable { table_size, slots: HashMap::new(), used: Vec::new() }
    }

    /// Folds the keys of a table into buckets, in row order.
    pub(crate) fn from_keys(table_size: usize, keys: &RowKeys) -> Result<Self> {
        let mut table = BucketTable::new(table_size);
        for (row_id, key) in keys.iter().enumerate() {
            if let Some(key) = key {
                table.insert(*key, row_id as u32)?;
            }
        }
        Ok(table)
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Number of occupied buckets.
    pub fn used_buckets(&self) -> usize {
        self.used.len()
    }

    /// Stores `row_id` in the first bucket from `key.home` that is free or holds the same
    /// fingerprint. Returns the slot used.
    pub fn insert(&mut self, key: TupleKey, row_id: u32) -> Result<usize> {
        let mut slot = key.home % self.table_size.max(1);
        for _ in 0..self.table_size {
            match self.slots.get_mut(&slot) {
                None => {
                    let bucket = Bucket { fingerprint: key.fingerprint, rows: vec![row_id] };
                    self.slots.insert(slot, bucket);
                    self.used.push(slot);
                    return Ok(slot);
                }
                Some(bucket) if bucket.fingerprint == key.fingerprint => {
                    bucket.rows.push(row_id);
                    return Ok(slot);
                }
                Some(_) => slot = (slot + 1) % self.table_size,
            }
        }
        Err(SmhError::TableFull { table_size: self.table_size })
    }

    /// The bucket holding `key`, following the probe sequence of [`BucketTable::insert`].
    pub fn find(&self, key: TupleKey) -> Option<&Bucket> {
        let mut slot = key.home % self.table_size.max(1);
        for _ in 0..self.table_size {
            match self.slots.get(&slot) {
                None => return None,
                Some(bucket) if bucket.fingerprint == key.fingerprint => return Some(bucket),
                Some(_) => slot = (slot + 1) % self.table_size,
            }
        }
        None
    }

    /// Occupied buckets in the order they were first used.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.used.iter().filter_map(|slot| self.slots.get(slot))
    }
}

/// Every bucket table of a mining pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketIndex {
    tables: Vec<BucketTable>,
}

impl BucketIndex {
    pub fn new() -> Self {
        BucketIndex::default()
    }

    pub fn push(&mut self, table: BucketTable) {
        self.tables.push(table);
    }

    pub fn tables(&self) -> &[BucketTable] {
        &self.tables
    }

    pub fn table(&self, table: usize) -> Option<&BucketTable> {
        self.tables.get(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
