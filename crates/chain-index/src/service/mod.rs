//! # Chain Index Service
//!
//! The application service implementing every inbound port.
//!
//! ## Architecture
//!
//! This service:
//! 1. Implements `EntityStoreApi` for constrained inserts and lookups
//! 2. Implements `OrderedAssociationApi` for ordered child collections
//! 3. Implements `ChainLinkageApi` for parent resolution and reorgs
//! 4. Implements `RangeMetricsApi` for weighted range counts
//!
//! Every mutating operation validates against a `StagedBatch` layered over the
//! store and commits it with a single `atomic_batch_write`. A failed
//! operation drops its batch, so the store never holds a partial write.

mod associations;
mod linkage;
mod metrics;
mod reader;
mod staging;
mod store;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapters::storage::InMemoryKVStore;
use crate::domain::config::IndexConfig;
use crate::domain::errors::IndexError;
use crate::ports::outbound::KeyValueStore;

use reader::EntityReader;
use staging::StagedBatch;

/// The chain index over a key-value store.
pub struct ChainIndexService<KV: KeyValueStore> {
    /// Ordered key-value store for persistence.
    pub(crate) kv_store: KV,
    /// Index configuration.
    pub(crate) config: IndexConfig,
}

/// A chain index shared between one writer and many readers.
pub type SharedChainIndex<KV> = Arc<RwLock<ChainIndexService<KV>>>;

impl<KV: KeyValueStore> ChainIndexService<KV> {
    /// Create a service over `kv_store`.
    pub fn new(kv_store: KV, config: IndexConfig) -> Self {
        Self { kv_store, config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &KV {
        &self.kv_store
    }

    /// Wrap the service for sharing across threads.
    pub fn into_shared(self) -> SharedChainIndex<KV> {
        Arc::new(RwLock::new(self))
    }

    pub(crate) fn reader(&self) -> EntityReader<'_, KV> {
        EntityReader::new(&self.kv_store)
    }

    /// Stage writes with `stage`, then commit them in one atomic write.
    ///
    /// Nothing is written if `stage` fails or stages nothing.
    pub(crate) fn write_with<T>(
        &mut self,
        stage: impl FnOnce(&mut StagedBatch<'_, KV>, &IndexConfig) -> Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        let (result, operations) = {
            let mut staged = StagedBatch::new(&self.kv_store);
            let result = stage(&mut staged, &self.config)?;
            (result, staged.into_operations())
        };
        if !operations.is_empty() {
            self.kv_store.atomic_batch_write(operations)?;
        }
        Ok(result)
    }
}

impl ChainIndexService<InMemoryKVStore> {
    /// Create a service over a fresh in-memory store.
    pub fn new_in_memory(config: IndexConfig) -> Self {
        Self::new(InMemoryKVStore::new(), config)
    }
}
