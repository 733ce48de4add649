//! # Inbound Ports (Driving Ports)
//!
//! The primary API of the chain index, split by component.
//!
//! Every mutating operation is atomic: it either commits all of its rows in
//! one batch or fails without touching the store.

use shared_types::{Hash, U256};

use crate::domain::entities::{
    BlockView, Header, LogKey, LogView, ReceiptKey, ReceiptView, Topic, Transaction,
};
use crate::domain::errors::IndexError;
use crate::domain::linkage::{Attachment, HeadWeight, ReorgOutcome};
use crate::domain::metrics::RangeCounts;
use crate::domain::unit::BlockUnit;

/// Constrained inserts and materialized lookups of the indexed entities.
pub trait EntityStoreApi {
    /// Insert a single header exactly as given.
    ///
    /// ## Errors
    ///
    /// - `ConstraintViolation`: both parents set, resolved parent not stored,
    ///   detached parent already stored, parentless non-genesis header,
    ///   non-canonical genesis, duplicate hash, or a second canonical header
    ///   at the same block number
    fn insert_header(&mut self, header: Header) -> Result<Attachment, IndexError>;

    /// Insert a transaction that may not belong to any block yet.
    ///
    /// ## Errors
    ///
    /// - `ConstraintViolation`: duplicate hash, or `block_header_hash` names
    ///   a block that is not stored
    fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), IndexError>;

    /// Insert a topic value. Returns `false` if it was already stored.
    fn insert_topic(&mut self, topic: Topic) -> Result<bool, IndexError>;

    /// Insert everything observed for one block as a single atomic write.
    ///
    /// The header is attached or detached depending on whether its parent is
    /// stored. Transactions, uncle headers and topics already present are
    /// reused.
    ///
    /// ## Errors
    ///
    /// - `ConstraintViolation`: any referential or uniqueness failure
    /// - `DuplicateIndex` / `RangeError`: ordering failures
    fn insert_block_unit(&mut self, unit: BlockUnit) -> Result<Attachment, IndexError>;

    fn header(&self, hash: &Hash) -> Result<Header, IndexError>;

    /// Every stored header at `number`, all forks included, ordered by hash.
    fn headers_at_number(&self, number: u64) -> Result<Vec<Header>, IndexError>;

    /// A materialized block with its ordered transactions and uncles.
    fn block(&self, hash: &Hash) -> Result<BlockView, IndexError>;

    fn transaction(&self, hash: &Hash) -> Result<Transaction, IndexError>;

    /// Blocks including the transaction, on any fork.
    fn transaction_blocks(&self, transaction_hash: &Hash) -> Result<Vec<Hash>, IndexError>;

    /// A receipt with its ordered logs, each with its ordered topics.
    fn receipt(&self, key: &ReceiptKey) -> Result<ReceiptView, IndexError>;

    /// Receipts of one transaction under every block that includes it.
    fn receipts_for_transaction(
        &self,
        transaction_hash: &Hash,
    ) -> Result<Vec<ReceiptView>, IndexError>;

    fn log(&self, key: &LogKey) -> Result<LogView, IndexError>;

    fn topic(&self, topic: &Hash) -> Result<Topic, IndexError>;

    /// Logs carrying `topic` at any position.
    fn logs_with_topic(&self, topic: &Hash) -> Result<Vec<LogKey>, IndexError>;

    /// Blocks that reference the header as an uncle.
    fn uncle_blocks(&self, uncle_hash: &Hash) -> Result<Vec<Hash>, IndexError>;
}

/// Ordered child collections.
///
/// Readers return `(index, child)` pairs ascending by index; gaps are kept.
pub trait OrderedAssociationApi {
    /// ## Errors
    ///
    /// - `DuplicateIndex`: `idx` already used in the block
    /// - `RangeError`: negative `idx`
    /// - `ConstraintViolation`: unknown block or transaction, or the
    ///   transaction is already in the block
    fn add_block_transaction(
        &mut self,
        block_hash: &Hash,
        transaction_hash: &Hash,
        idx: i64,
    ) -> Result<(), IndexError>;

    /// ## Errors
    ///
    /// Same as [`OrderedAssociationApi::add_block_transaction`], for uncles.
    fn add_block_uncle(
        &mut self,
        block_hash: &Hash,
        uncle_hash: &Hash,
        idx: i64,
    ) -> Result<(), IndexError>;

    /// ## Errors
    ///
    /// - `DuplicateIndex`: `idx` already used in the log
    /// - `RangeError`: `idx` negative or above the topic bound
    /// - `ConstraintViolation`: unknown log or topic
    fn add_log_topic(&mut self, log: &LogKey, topic: &Hash, idx: i64) -> Result<(), IndexError>;

    fn block_transactions(&self, block_hash: &Hash) -> Result<Vec<(u32, Hash)>, IndexError>;

    fn block_uncles(&self, block_hash: &Hash) -> Result<Vec<(u32, Hash)>, IndexError>;

    fn log_topics(&self, log: &LogKey) -> Result<Vec<(u32, Hash)>, IndexError>;
}

/// Parent resolution and canonical chain selection.
pub trait ChainLinkageApi {
    /// Insert a header, resolving its wire parent against the store.
    fn attach(&mut self, header: Header) -> Result<Attachment, IndexError>;

    /// Reattach headers waiting for `parent_hash`. Returns the reattached
    /// children; empty when nothing was pending.
    fn resolve_pending(&mut self, parent_hash: &Hash) -> Result<Vec<Hash>, IndexError>;

    /// Make `new_head` canonical if `weight` beats the current head.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: unknown head
    /// - `ConstraintViolation`: the head is not connected to the canonical
    ///   chain, or the fork is deeper than the configured bound
    fn reorganize(&mut self, new_head: &Hash, weight: U256) -> Result<ReorgOutcome, IndexError>;

    /// Canonical header with the highest block number, if any.
    fn canonical_head(&self) -> Result<Option<Header>, IndexError>;

    fn canonical_hash_at(&self, number: u64) -> Result<Option<Hash>, IndexError>;

    fn canonical_header_at(&self, number: u64) -> Result<Header, IndexError>;

    /// Weight recorded by the last accepted reorganization.
    fn head_weight(&self) -> Result<Option<HeadWeight>, IndexError>;

    /// Headers detached from `parent_hash`.
    fn pending_children(&self, parent_hash: &Hash) -> Result<Vec<Hash>, IndexError>;
}

/// Weighted item counts over committed data.
pub trait RangeMetricsApi {
    /// Per-kind counts for canonical blocks numbered in `(start, end]`.
    fn range_counts(&self, start: u64, end: u64) -> Result<RangeCounts, IndexError>;

    /// Weighted total for canonical blocks numbered in `(start, end]`.
    fn weighted_count(&self, start: u64, end: u64) -> Result<u64, IndexError> {
        Ok(self.range_counts(start, end)?.weighted_total())
    }
}
