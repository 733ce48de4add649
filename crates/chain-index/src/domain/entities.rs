//! # Index Entities
//!
//! Rows of the chain index and the composite keys that address them.
//!
//! ## Mutability
//!
//! Every row is write-once, except `Header::is_canonical`, `Header::parent_hash`
//! and `Header::detached_parent_hash`, which only the chain linkage rewrites.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{
    is_genesis_parent, short_hex, Address, Bloom, Hash, HeaderNonce, EMPTY_BLOOM,
    GENESIS_PARENT_HASH, U256,
};

use crate::domain::errors::IndexError;

/// Parent reference of a header, as a tagged state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentLink {
    /// No parent. Only block number 0.
    Genesis,
    /// The parent header is stored.
    Resolved(Hash),
    /// The parent is known by hash but not stored yet.
    Detached(Hash),
}

impl ParentLink {
    /// The parent hash, if any.
    pub fn parent_hash(&self) -> Option<Hash> {
        match self {
            ParentLink::Genesis => None,
            ParentLink::Resolved(hash) | ParentLink::Detached(hash) => Some(*hash),
        }
    }
}

/// A block header.
///
/// `parent_hash` and `detached_parent_hash` mirror the two persisted parent
/// columns; at most one of them may be set (see [`Header::parent_link`]).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub hash: Hash,
    /// Resolved parent (the parent header is stored).
    pub parent_hash: Option<Hash>,
    /// Parent hash observed before the parent itself.
    pub detached_parent_hash: Option<Hash>,
    pub is_canonical: bool,
    pub uncles_hash: Hash,
    pub coinbase: Address,
    pub state_root: Hash,
    pub transaction_root: Hash,
    pub receipt_root: Hash,
    #[serde_as(as = "Bytes")]
    pub bloom: Bloom,
    pub difficulty: U256,
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    #[serde_as(as = "Bytes")]
    pub extra_data: Vec<u8>,
    pub mix_hash: Hash,
    pub nonce: HeaderNonce,
}

impl Header {
    /// Create a header with empty payload fields.
    ///
    /// `parent_hash` is the hash carried on the wire; the genesis sentinel
    /// leaves the header without a parent.
    pub fn new(hash: Hash, parent_hash: Hash, block_number: u64) -> Self {
        Self {
            hash,
            parent_hash: None,
            detached_parent_hash: None,
            is_canonical: false,
            uncles_hash: [0u8; 32],
            coinbase: [0u8; 20],
            state_root: [0u8; 32],
            transaction_root: [0u8; 32],
            receipt_root: [0u8; 32],
            bloom: EMPTY_BLOOM,
            difficulty: U256::zero(),
            block_number,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            mix_hash: [0u8; 32],
            nonce: [0u8; 8],
        }
        .with_wire_parent(parent_hash)
    }

    /// Set the parent from a wire parent hash, clearing any detached marker.
    pub fn with_wire_parent(mut self, parent_hash: Hash) -> Self {
        self.parent_hash = (!is_genesis_parent(&parent_hash)).then_some(parent_hash);
        self.detached_parent_hash = None;
        self
    }

    /// Set the canonical flag.
    pub fn canonical(mut self, is_canonical: bool) -> Self {
        self.is_canonical = is_canonical;
        self
    }

    /// The parent reference as a tagged state.
    ///
    /// Fails if both parent columns are set.
    pub fn parent_link(&self) -> Result<ParentLink, IndexError> {
        match (self.parent_hash, self.detached_parent_hash) {
            (Some(_), Some(_)) => Err(IndexError::constraint(
                "header",
                format!(
                    "{} has both a resolved and a detached parent",
                    short_hex(&self.hash)
                ),
            )),
            (Some(parent), None) => Ok(ParentLink::Resolved(parent)),
            (None, Some(parent)) => Ok(ParentLink::Detached(parent)),
            (None, None) => Ok(ParentLink::Genesis),
        }
    }

    /// Parent hash as it appears on the wire.
    pub fn wire_parent_hash(&self) -> Hash {
        self.parent_hash
            .or(self.detached_parent_hash)
            .unwrap_or(GENESIS_PARENT_HASH)
    }

    /// Block number 0, canonical and parentless.
    pub fn is_genesis(&self) -> bool {
        self.block_number == 0
            && self.is_canonical
            && self.parent_hash.is_none()
            && self.detached_parent_hash.is_none()
    }

    /// Parent recorded by hash only, waiting for reattachment.
    pub fn is_detached(&self) -> bool {
        self.parent_hash.is_none() && self.detached_parent_hash.is_some()
    }
}

/// Marker row for a header materialized as a full block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header_hash: Hash,
}

/// A transaction, possibly not included in any block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
    pub v: Hash,
    pub r: Hash,
    pub s: Hash,
    pub sender: Address,
    /// Block the transaction was observed in, if any.
    pub block_header_hash: Option<Hash>,
}

/// Ordered join row: transaction `idx` of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub block_header_hash: Hash,
    pub transaction_hash: Hash,
    pub idx: i64,
}

/// Ordered join row: uncle `idx` of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUncle {
    pub block_header_hash: Hash,
    pub uncle_hash: Hash,
    pub idx: i64,
}

/// Receipt key: one receipt per (transaction, block) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiptKey {
    pub transaction_hash: Hash,
    pub block_header_hash: Hash,
}

impl ReceiptKey {
    pub fn new(transaction_hash: Hash, block_header_hash: Hash) -> Self {
        Self {
            transaction_hash,
            block_header_hash,
        }
    }
}

impl std::fmt::Display for ReceiptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tx {} @ block {}",
            short_hex(&self.transaction_hash),
            short_hex(&self.block_header_hash)
        )
    }
}

/// A transaction receipt under one block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: Hash,
    pub block_header_hash: Hash,
    pub state_root: Hash,
    pub gas_used: u64,
    #[serde_as(as = "Bytes")]
    pub bloom: Bloom,
}

impl Receipt {
    pub fn key(&self) -> ReceiptKey {
        ReceiptKey::new(self.transaction_hash, self.block_header_hash)
    }
}

/// Log key: position `idx` within the receipt of (transaction, block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogKey {
    pub block_header_hash: Hash,
    pub transaction_hash: Hash,
    pub idx: u32,
}

impl LogKey {
    pub fn new(block_header_hash: Hash, transaction_hash: Hash, idx: u32) -> Self {
        Self {
            block_header_hash,
            transaction_hash,
            idx,
        }
    }

    /// Key of the receipt owning this log.
    pub fn receipt_key(&self) -> ReceiptKey {
        ReceiptKey::new(self.transaction_hash, self.block_header_hash)
    }
}

impl std::fmt::Display for LogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "log {} of {}", self.idx, self.receipt_key())
    }
}

/// A log emitted by a transaction under one block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub idx: u32,
    pub transaction_hash: Hash,
    pub block_header_hash: Hash,
    pub address: Address,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

impl Log {
    pub fn key(&self) -> LogKey {
        LogKey::new(self.block_header_hash, self.transaction_hash, self.idx)
    }

    pub fn receipt_key(&self) -> ReceiptKey {
        ReceiptKey::new(self.transaction_hash, self.block_header_hash)
    }
}

/// A deduplicated topic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub topic: Hash,
}

/// Ordered join row: topic `idx` (0..=3) of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTopic {
    pub log: LogKey,
    pub idx: i64,
    pub topic: Hash,
}

/// A block with its ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub header: Header,
    /// Ascending by block-transaction index.
    pub transactions: Vec<Transaction>,
    /// Ascending by block-uncle index.
    pub uncles: Vec<Header>,
}

/// A log with its ordered topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogView {
    pub log: Log,
    /// Ascending by log-topic index.
    pub topics: Vec<Topic>,
}

/// A receipt with its logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptView {
    pub receipt: Receipt,
    /// Ascending by log index.
    pub logs: Vec<LogView>,
}
