//! # Block Units
//!
//! The record set describing one observed block, written atomically.

use shared_types::Hash;

use crate::domain::entities::{
    BlockTransaction, BlockUncle, Header, Log, LogKey, LogTopic, Receipt, Topic, Transaction,
};

/// Everything observed for one block.
///
/// Association rows carry their indices explicitly; the builder methods
/// below fill them in from the arguments, never from push order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUnit {
    pub header: Header,
    /// Uncle headers referenced by `block_uncles` that may not be stored yet.
    pub uncles: Vec<Header>,
    pub block_uncles: Vec<BlockUncle>,
    pub transactions: Vec<Transaction>,
    pub block_transactions: Vec<BlockTransaction>,
    pub receipts: Vec<Receipt>,
    pub logs: Vec<Log>,
    pub topics: Vec<Topic>,
    pub log_topics: Vec<LogTopic>,
}

impl BlockUnit {
    /// An empty block for `header`.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            uncles: Vec::new(),
            block_uncles: Vec::new(),
            transactions: Vec::new(),
            block_transactions: Vec::new(),
            receipts: Vec::new(),
            logs: Vec::new(),
            topics: Vec::new(),
            log_topics: Vec::new(),
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    /// Add `uncle` at position `idx`.
    pub fn with_uncle(mut self, uncle: Header, idx: i64) -> Self {
        self.block_uncles.push(BlockUncle {
            block_header_hash: self.header.hash,
            uncle_hash: uncle.hash,
            idx,
        });
        self.uncles.push(uncle);
        self
    }

    /// Add `transaction` at position `idx`.
    pub fn with_transaction(mut self, transaction: Transaction, idx: i64) -> Self {
        self.block_transactions.push(BlockTransaction {
            block_header_hash: self.header.hash,
            transaction_hash: transaction.hash,
            idx,
        });
        self.transactions.push(transaction);
        self
    }

    pub fn with_receipt(mut self, receipt: Receipt) -> Self {
        self.receipts.push(receipt);
        self
    }

    pub fn with_log(mut self, log: Log) -> Self {
        self.logs.push(log);
        self
    }

    /// Add `topic` at position `idx` of `log`, registering the topic value once.
    pub fn with_log_topic(mut self, log: LogKey, topic: Hash, idx: i64) -> Self {
        if !self.topics.iter().any(|t| t.topic == topic) {
            self.topics.push(Topic { topic });
        }
        self.log_topics.push(LogTopic { log, idx, topic });
        self
    }

    /// Number of rows the unit writes, associations included.
    pub fn row_count(&self) -> usize {
        2 + self.uncles.len()
            + self.block_uncles.len()
            + self.transactions.len()
            + self.block_transactions.len()
            + self.receipts.len()
            + self.logs.len()
            + self.topics.len()
            + self.log_topics.len()
    }
}
