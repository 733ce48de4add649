//! # Adapters Module
//!
//! Adapter implementations for the chain index ports.
//!
//! ## Modules
//!
//! - `storage`: `KeyValueStore` implementations (in-memory, RocksDB)
//! - `codec`: bincode value encoding

pub mod codec;
pub mod storage;

pub use codec::BincodeCodec;
pub use storage::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
