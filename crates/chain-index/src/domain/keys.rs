//! # Storage Keys
//!
//! Key layout of the chain index inside an ordered key-value store.
//!
//! All numbers are encoded big-endian, so a prefix scan returns headers
//! ascending by block number and association children ascending by index.

use shared_types::Hash;

use crate::domain::entities::{LogKey, ReceiptKey};

/// Key prefixes for the key-value store.
///
/// All keys are prefixed to namespace different row kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Header rows: `hd:{hash}` -> Header
    Header,
    /// Headers per height: `hn:{number}{hash}` -> ()
    HeaderByNumber,
    /// Pending reattachment: `hp:{detached_parent}{child}` -> ()
    PendingChild,
    /// Canonical index: `cn:{number}` -> Hash
    Canonical,
    /// Block marker rows: `bk:{hash}` -> Block
    Block,
    /// Transaction rows: `tx:{hash}` -> Transaction
    Transaction,
    /// Block transactions by order: `bt:{block}{idx}` -> tx hash
    BlockTransaction,
    /// Block transactions by member: `bT:{tx}{block}` -> idx
    BlockTransactionMember,
    /// Block uncles by order: `bu:{block}{idx}` -> uncle hash
    BlockUncle,
    /// Block uncles by member: `bU:{uncle}{block}` -> idx
    BlockUncleMember,
    /// Receipt rows: `rc:{block}{tx}` -> Receipt
    Receipt,
    /// Receipts per transaction: `rt:{tx}{block}` -> ()
    ReceiptByTransaction,
    /// Log rows: `lg:{block}{tx}{idx}` -> Log
    Log,
    /// Log topics by order: `lt:{log key}{idx}` -> topic
    LogTopic,
    /// Log topics by member: `lT:{topic}{log key}{idx}` -> idx
    LogTopicMember,
    /// Topic rows: `tp:{topic}` -> Topic
    Topic,
    /// Index metadata: `m:{name}`
    Metadata,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Header => b"hd:",
            KeyPrefix::HeaderByNumber => b"hn:",
            KeyPrefix::PendingChild => b"hp:",
            KeyPrefix::Canonical => b"cn:",
            KeyPrefix::Block => b"bk:",
            KeyPrefix::Transaction => b"tx:",
            KeyPrefix::BlockTransaction => b"bt:",
            KeyPrefix::BlockTransactionMember => b"bT:",
            KeyPrefix::BlockUncle => b"bu:",
            KeyPrefix::BlockUncleMember => b"bU:",
            KeyPrefix::Receipt => b"rc:",
            KeyPrefix::ReceiptByTransaction => b"rt:",
            KeyPrefix::Log => b"lg:",
            KeyPrefix::LogTopic => b"lt:",
            KeyPrefix::LogTopicMember => b"lT:",
            KeyPrefix::Topic => b"tp:",
            KeyPrefix::Metadata => b"m:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    /// Build a key from a [`StorageKey`] value.
    pub fn key_of<K: StorageKey>(&self, value: &K) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        value.write_key(&mut key);
        key
    }

    pub fn header_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Header.key(hash)
    }

    pub fn header_by_number_prefix(number: u64) -> Vec<u8> {
        KeyPrefix::HeaderByNumber.key(&number.to_be_bytes())
    }

    pub fn header_by_number_key(number: u64, hash: &Hash) -> Vec<u8> {
        let mut key = Self::header_by_number_prefix(number);
        key.extend_from_slice(hash);
        key
    }

    pub fn pending_child_prefix(parent_hash: &Hash) -> Vec<u8> {
        KeyPrefix::PendingChild.key(parent_hash)
    }

    pub fn pending_child_key(parent_hash: &Hash, child_hash: &Hash) -> Vec<u8> {
        let mut key = Self::pending_child_prefix(parent_hash);
        key.extend_from_slice(child_hash);
        key
    }

    pub fn canonical_key(number: u64) -> Vec<u8> {
        KeyPrefix::Canonical.key(&number.to_be_bytes())
    }

    pub fn block_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Block.key(hash)
    }

    pub fn transaction_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Transaction.key(hash)
    }

    pub fn receipt_key(key: &ReceiptKey) -> Vec<u8> {
        let mut out = KeyPrefix::Receipt.key(&key.block_header_hash);
        out.extend_from_slice(&key.transaction_hash);
        out
    }

    pub fn receipt_by_transaction_key(key: &ReceiptKey) -> Vec<u8> {
        let mut out = KeyPrefix::ReceiptByTransaction.key(&key.transaction_hash);
        out.extend_from_slice(&key.block_header_hash);
        out
    }

    pub fn log_key(key: &LogKey) -> Vec<u8> {
        KeyPrefix::Log.key_of(key)
    }

    /// Prefix covering every log of one receipt.
    pub fn logs_of_receipt_prefix(key: &ReceiptKey) -> Vec<u8> {
        let mut out = KeyPrefix::Log.key(&key.block_header_hash);
        out.extend_from_slice(&key.transaction_hash);
        out
    }

    pub fn topic_key(topic: &Hash) -> Vec<u8> {
        KeyPrefix::Topic.key(topic)
    }

    pub fn metadata_key(name: &str) -> Vec<u8> {
        KeyPrefix::Metadata.key(name.as_bytes())
    }
}

/// Fixed-width binary encoding of a value embedded in storage keys.
pub trait StorageKey: Sized {
    /// Encoded length in bytes.
    const ENCODED_LEN: usize;

    /// Append the encoding to `out`.
    fn write_key(&self, out: &mut Vec<u8>);

    /// Decode from exactly `ENCODED_LEN` bytes.
    fn read_key(bytes: &[u8]) -> Option<Self>;

    fn to_key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        self.write_key(&mut out);
        out
    }
}

impl StorageKey for Hash {
    const ENCODED_LEN: usize = 32;

    fn write_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }

    fn read_key(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok()
    }
}

impl StorageKey for LogKey {
    const ENCODED_LEN: usize = 32 + 32 + 4;

    fn write_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.block_header_hash);
        out.extend_from_slice(&self.transaction_hash);
        out.extend_from_slice(&self.idx.to_be_bytes());
    }

    fn read_key(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        Some(LogKey {
            block_header_hash: bytes[..32].try_into().ok()?,
            transaction_hash: bytes[32..64].try_into().ok()?,
            idx: u32::from_be_bytes(bytes[64..68].try_into().ok()?),
        })
    }
}

/// Decode a big-endian `u32` from the last four bytes of `key`.
pub(crate) fn trailing_u32(key: &[u8]) -> Option<u32> {
    let start = key.len().checked_sub(4)?;
    Some(u32::from_be_bytes(key[start..].try_into().ok()?))
}

/// Decode a big-endian `u64` starting at `offset`.
pub(crate) fn u64_at(key: &[u8], offset: usize) -> Option<u64> {
    let bytes = key.get(offset..offset + 8)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

/// Decode a hash starting at `offset`.
pub(crate) fn hash_at(key: &[u8], offset: usize) -> Option<Hash> {
    key.get(offset..offset + 32)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        let all = [
            KeyPrefix::Header,
            KeyPrefix::HeaderByNumber,
            KeyPrefix::PendingChild,
            KeyPrefix::Canonical,
            KeyPrefix::Block,
            KeyPrefix::Transaction,
            KeyPrefix::BlockTransaction,
            KeyPrefix::BlockTransactionMember,
            KeyPrefix::BlockUncle,
            KeyPrefix::BlockUncleMember,
            KeyPrefix::Receipt,
            KeyPrefix::ReceiptByTransaction,
            KeyPrefix::Log,
            KeyPrefix::LogTopic,
            KeyPrefix::LogTopicMember,
            KeyPrefix::Topic,
            KeyPrefix::Metadata,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.as_bytes().starts_with(b.as_bytes()), "{a:?} / {b:?}");
                assert!(!b.as_bytes().starts_with(a.as_bytes()), "{a:?} / {b:?}");
            }
        }
    }

    #[test]
    fn test_number_keys_sort_numerically() {
        let low = KeyPrefix::canonical_key(255);
        let high = KeyPrefix::canonical_key(256);
        assert!(low < high);
        assert_eq!(u64_at(&high, KeyPrefix::Canonical.as_bytes().len()), Some(256));
    }

    #[test]
    fn test_log_key_encoding() {
        let key = LogKey::new([1; 32], [2; 32], 7);
        let bytes = key.to_key_bytes();
        assert_eq!(bytes.len(), LogKey::ENCODED_LEN);
        assert_eq!(LogKey::read_key(&bytes), Some(key));
        assert_eq!(trailing_u32(&bytes), Some(7));
        assert_eq!(LogKey::read_key(&bytes[1..]), None);
    }

    #[test]
    fn test_log_prefix_covers_receipt_logs() {
        let log = LogKey::new([1; 32], [2; 32], 3);
        let prefix = KeyPrefix::logs_of_receipt_prefix(&log.receipt_key());
        assert!(KeyPrefix::log_key(&log).starts_with(&prefix));
    }
}
