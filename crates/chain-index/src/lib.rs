//! # Chain Index
//!
//! A canonical, reorg-tolerant index of blockchain data: headers, blocks,
//! transactions, receipts, logs and log topics, with ordered child
//! collections and weighted range metrics.
//!
//! ## Components
//!
//! ```text
//!   block unit ──→ EntityStore ──→ ChainLinkage (attach / detach / reattach)
//!                       │
//!                       └──→ OrderedAssociation (tx, uncle, topic order)
//!
//!   RangeMetrics ──→ committed canonical blocks only
//! ```
//!
//! ## Domain Invariants
//!
//! | Rule | Description |
//! |------|-------------|
//! | Parent linkage | Resolved parent XOR detached parent XOR none (genesis only) |
//! | Genesis | Block 0, canonical, parentless |
//! | Numbering | A child is numbered one past its resolved parent |
//! | Ordering | Indices unique per parent; log topics bounded to [0, 3] |
//! | Receipts | One receipt per (transaction, block) pair |
//! | Canonical chain | At most one canonical header per block number |
//! | Atomicity | Every write commits in one batch or not at all |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, key layout, ordering and linkage rules
//! - `ports/` - Inbound API traits, outbound key-value port
//! - `adapters/` - In-memory and RocksDB stores, bincode codec
//! - `service/` - `ChainIndexService` implementing every inbound port
//!
//! ## Usage
//!
//! ```ignore
//! use chain_index::{ChainIndexService, EntityStoreApi, ChainLinkageApi, IndexConfig};
//!
//! let mut index = ChainIndexService::new_in_memory(IndexConfig::default());
//! index.insert_block_unit(unit)?;
//! index.reorganize(&head_hash, total_difficulty)?;
//! let total = index.weighted_count(0, 10)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Builders for tests.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export key types for convenience
pub use adapters::{BincodeCodec, InMemoryKVStore};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::config::IndexConfig;
pub use domain::entities::{
    Block, BlockTransaction, BlockUncle, BlockView, Header, Log, LogKey, LogTopic, LogView,
    ParentLink, Receipt, ReceiptKey, ReceiptView, Topic, Transaction,
};
pub use domain::errors::{CodecError, IndexError, KVStoreError};
pub use domain::linkage::{Attachment, HeadWeight, ReorgOutcome};
pub use domain::metrics::RangeCounts;
pub use domain::ordering::{AssociationKind, OrderedAssociation};
pub use domain::unit::BlockUnit;
pub use ports::inbound::{
    ChainLinkageApi, EntityStoreApi, OrderedAssociationApi, RangeMetricsApi,
};
pub use ports::outbound::{BatchOperation, KeyValueRead, KeyValueStore};
pub use service::{ChainIndexService, SharedChainIndex};
pub use shared_types::{Address, Hash, U256};
