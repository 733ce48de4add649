//! # Outbound Ports (Driven Ports)
//!
//! The storage dependency required by the chain index.
//!
//! Production: `RocksDbStore` (feature `rocksdb`)
//! Testing: `InMemoryKVStore`

use crate::domain::errors::KVStoreError;

/// Read side of an ordered key-value store.
pub trait KeyValueRead: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, ascending by key.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;

    /// All entries with `start <= key < end`, ascending by key.
    fn range_scan(&self, start: &[u8], end: &[u8])
        -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;
}

/// Abstract interface for an ordered key-value database.
pub trait KeyValueStore: KeyValueRead {
    /// Execute an atomic batch write.
    ///
    /// ## Atomicity
    ///
    /// Either ALL operations in the batch are applied, or NONE are. Readers
    /// never observe a partially applied batch.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}
