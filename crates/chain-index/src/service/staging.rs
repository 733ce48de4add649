//! # Staged Writes
//!
//! Every mutating operation stages its writes on top of the committed store,
//! validates against the merged view, and commits the whole batch with one
//! `atomic_batch_write`. Dropping a `StagedBatch` discards it.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapters::codec::BincodeCodec;
use crate::domain::errors::{IndexError, KVStoreError};
use crate::ports::outbound::{BatchOperation, KeyValueRead};

/// Pending writes layered over a committed store.
pub(crate) struct StagedBatch<'a, R: KeyValueRead> {
    base: &'a R,
    /// `None` marks a staged delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, R: KeyValueRead> StagedBatch<'a, R> {
    pub(crate) fn new(base: &'a R) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    pub(crate) fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub(crate) fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    pub(crate) fn put_value<T: Serialize>(
        &mut self,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), IndexError> {
        let encoded = BincodeCodec::encode(value)?;
        self.put(key, encoded);
        Ok(())
    }

    /// Drain into batch operations, ascending by key.
    pub(crate) fn into_operations(self) -> Vec<BatchOperation> {
        self.writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key, value),
                None => BatchOperation::delete(key),
            })
            .collect()
    }
}

impl<R: KeyValueRead> KeyValueRead for StagedBatch<'_, R> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get(key),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let base = self.base.prefix_scan(prefix)?;
        let staged = self
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        Ok(merge_entries(base, staged))
    }

    fn range_scan(
        &self,
        start: &[u8],
        end: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let base = self.base.range_scan(start, end)?;
        let staged = self
            .writes
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)));
        Ok(merge_entries(base, staged))
    }
}

/// Overlay staged writes onto base entries of the same key range.
fn merge_entries<'s>(
    base: Vec<(Vec<u8>, Vec<u8>)>,
    staged: impl Iterator<Item = (&'s Vec<u8>, &'s Option<Vec<u8>>)>,
) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = base.into_iter().collect();
    for (key, value) in staged {
        match value {
            Some(value) => {
                merged.insert(key.clone(), value.clone());
            }
            None => {
                merged.remove(key);
            }
        }
    }
    merged.into_iter().collect()
}

/// Decode an optional stored value.
pub(crate) fn decode_opt<T: DeserializeOwned>(
    value: Option<Vec<u8>>,
) -> Result<Option<T>, IndexError> {
    value
        .map(|bytes| BincodeCodec::decode(&bytes).map_err(IndexError::from))
        .transpose()
}
