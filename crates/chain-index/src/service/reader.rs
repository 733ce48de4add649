//! Typed reads over any `KeyValueRead`, committed store or staged batch.

use serde::de::DeserializeOwned;
use shared_types::{short_hex, Hash};

use crate::adapters::codec::BincodeCodec;
use crate::domain::entities::{
    BlockView, Header, Log, LogKey, LogView, Receipt, ReceiptKey, ReceiptView, Topic,
    Transaction,
};
use crate::domain::errors::IndexError;
use crate::domain::keys::{hash_at, u64_at, KeyPrefix, StorageKey};
use crate::domain::linkage::{HeadWeight, HeaderSource};
use crate::domain::ordering::{OrderedAssociation, BLOCK_TRANSACTIONS, BLOCK_UNCLES, LOG_TOPICS};
use crate::ports::outbound::KeyValueRead;

use super::staging::decode_opt;

/// Metadata name of the recorded head weight.
pub(crate) const HEAD_WEIGHT: &str = "head_weight";

pub(crate) struct EntityReader<'a, R: KeyValueRead> {
    kv: &'a R,
}

impl<'a, R: KeyValueRead> EntityReader<'a, R> {
    pub(crate) fn new(kv: &'a R) -> Self {
        Self { kv }
    }

    fn load<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, IndexError> {
        decode_opt(self.kv.get(key)?)
    }

    pub(crate) fn exists(&self, key: &[u8]) -> Result<bool, IndexError> {
        Ok(self.kv.exists(key)?)
    }

    pub(crate) fn header(&self, hash: &Hash) -> Result<Option<Header>, IndexError> {
        self.load(&KeyPrefix::header_key(hash))
    }

    pub(crate) fn require_header(&self, hash: &Hash) -> Result<Header, IndexError> {
        self.header(hash)?
            .ok_or_else(|| IndexError::not_found("header", short_hex(hash)))
    }

    pub(crate) fn header_exists(&self, hash: &Hash) -> Result<bool, IndexError> {
        self.exists(&KeyPrefix::header_key(hash))
    }

    pub(crate) fn block_exists(&self, hash: &Hash) -> Result<bool, IndexError> {
        self.exists(&KeyPrefix::block_key(hash))
    }

    pub(crate) fn headers_at_number(&self, number: u64) -> Result<Vec<Header>, IndexError> {
        let prefix = KeyPrefix::header_by_number_prefix(number);
        let offset = prefix.len();
        self.kv
            .prefix_scan(&prefix)?
            .into_iter()
            .filter_map(|(key, _)| hash_at(&key, offset))
            .map(|hash| self.require_header(&hash))
            .collect()
    }

    pub(crate) fn pending_children(&self, parent_hash: &Hash) -> Result<Vec<Hash>, IndexError> {
        let prefix = KeyPrefix::pending_child_prefix(parent_hash);
        let offset = prefix.len();
        Ok(self
            .kv
            .prefix_scan(&prefix)?
            .into_iter()
            .filter_map(|(key, _)| hash_at(&key, offset))
            .collect())
    }

    pub(crate) fn canonical_hash_at(&self, number: u64) -> Result<Option<Hash>, IndexError> {
        Ok(self
            .kv
            .get(&KeyPrefix::canonical_key(number))?
            .and_then(|value| Hash::read_key(&value)))
    }

    /// Canonical `(number, hash)` entries with `number >= from`, ascending.
    pub(crate) fn canonical_from(&self, from: u64) -> Result<Vec<(u64, Hash)>, IndexError> {
        self.canonical_range(from, u64::MAX)
    }

    /// Canonical `(number, hash)` entries with `from <= number <= to`, ascending.
    pub(crate) fn canonical_range(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<(u64, Hash)>, IndexError> {
        let start = KeyPrefix::canonical_key(from);
        let entries = match to.checked_add(1) {
            Some(end) => self.kv.range_scan(&start, &KeyPrefix::canonical_key(end))?,
            None => {
                let mut scanned = self.kv.prefix_scan(KeyPrefix::Canonical.as_bytes())?;
                scanned.retain(|(key, _)| key.as_slice() >= start.as_slice());
                scanned
            }
        };

        let offset = KeyPrefix::Canonical.as_bytes().len();
        entries
            .into_iter()
            .map(|(key, value)| {
                let number = u64_at(&key, offset);
                match (number, Hash::read_key(&value)) {
                    (Some(number), Some(hash)) => Ok((number, hash)),
                    _ => Err(IndexError::Serialization {
                        message: "malformed canonical index entry".to_string(),
                    }),
                }
            })
            .collect()
    }

    pub(crate) fn canonical_head(&self) -> Result<Option<Header>, IndexError> {
        let last = self
            .kv
            .prefix_scan(KeyPrefix::Canonical.as_bytes())?
            .pop()
            .and_then(|(_, value)| Hash::read_key(&value));
        last.map(|hash| self.require_header(&hash)).transpose()
    }

    pub(crate) fn head_weight(&self) -> Result<Option<HeadWeight>, IndexError> {
        self.load(&KeyPrefix::metadata_key(HEAD_WEIGHT))
    }

    pub(crate) fn transaction(&self, hash: &Hash) -> Result<Option<Transaction>, IndexError> {
        self.load(&KeyPrefix::transaction_key(hash))
    }

    pub(crate) fn require_transaction(&self, hash: &Hash) -> Result<Transaction, IndexError> {
        self.transaction(hash)?
            .ok_or_else(|| IndexError::not_found("transaction", short_hex(hash)))
    }

    pub(crate) fn receipt(&self, key: &ReceiptKey) -> Result<Option<Receipt>, IndexError> {
        self.load(&KeyPrefix::receipt_key(key))
    }

    pub(crate) fn receipt_keys_for_transaction(
        &self,
        transaction_hash: &Hash,
    ) -> Result<Vec<ReceiptKey>, IndexError> {
        let prefix = KeyPrefix::ReceiptByTransaction.key(transaction_hash);
        let offset = prefix.len();
        Ok(self
            .kv
            .prefix_scan(&prefix)?
            .into_iter()
            .filter_map(|(key, _)| hash_at(&key, offset))
            .map(|block| ReceiptKey::new(*transaction_hash, block))
            .collect())
    }

    pub(crate) fn log(&self, key: &LogKey) -> Result<Option<Log>, IndexError> {
        self.load(&KeyPrefix::log_key(key))
    }

    pub(crate) fn logs_of_receipt(&self, key: &ReceiptKey) -> Result<Vec<Log>, IndexError> {
        self.kv
            .prefix_scan(&KeyPrefix::logs_of_receipt_prefix(key))?
            .into_iter()
            .map(|(_, value)| Ok(BincodeCodec::decode(&value)?))
            .collect()
    }

    pub(crate) fn topic(&self, topic: &Hash) -> Result<Option<Topic>, IndexError> {
        self.load(&KeyPrefix::topic_key(topic))
    }

    pub(crate) fn topic_exists(&self, topic: &Hash) -> Result<bool, IndexError> {
        self.exists(&KeyPrefix::topic_key(topic))
    }

    /// Children of `parent`, ascending by index.
    pub(crate) fn children_of<P: StorageKey, C: StorageKey>(
        &self,
        association: OrderedAssociation<P, C>,
        parent: &P,
    ) -> Result<Vec<(u32, C)>, IndexError> {
        self.kv
            .prefix_scan(&association.slot_prefix(parent))?
            .into_iter()
            .map(|(key, value)| {
                match (
                    association.decode_slot_index(&key),
                    association.decode_child(&value),
                ) {
                    (Some(idx), Some(child)) => Ok((idx, child)),
                    _ => Err(IndexError::Serialization {
                        message: format!("malformed {} entry", association.kind()),
                    }),
                }
            })
            .collect()
    }

    /// Distinct parents holding `child`, ascending by parent key.
    pub(crate) fn parents_of<P: StorageKey + PartialEq, C: StorageKey>(
        &self,
        association: OrderedAssociation<P, C>,
        child: &C,
    ) -> Result<Vec<P>, IndexError> {
        let mut parents: Vec<P> = Vec::new();
        for (key, _) in self.kv.prefix_scan(&association.member_prefix(child))? {
            let parent = association.decode_member_parent(&key).ok_or_else(|| {
                IndexError::Serialization {
                    message: format!("malformed {} member entry", association.kind()),
                }
            })?;
            if parents.last() != Some(&parent) {
                parents.push(parent);
            }
        }
        Ok(parents)
    }

    pub(crate) fn count_prefix(&self, prefix: &[u8]) -> Result<u64, IndexError> {
        Ok(self.kv.prefix_scan(prefix)?.len() as u64)
    }

    pub(crate) fn block_view(&self, hash: &Hash) -> Result<BlockView, IndexError> {
        if !self.block_exists(hash)? {
            return Err(IndexError::not_found("block", short_hex(hash)));
        }
        let header = self.require_header(hash)?;
        let transactions = self
            .children_of(BLOCK_TRANSACTIONS, hash)?
            .iter()
            .map(|(_, tx)| self.require_transaction(tx))
            .collect::<Result<_, _>>()?;
        let uncles = self
            .children_of(BLOCK_UNCLES, hash)?
            .iter()
            .map(|(_, uncle)| self.require_header(uncle))
            .collect::<Result<_, _>>()?;
        Ok(BlockView {
            header,
            transactions,
            uncles,
        })
    }

    pub(crate) fn log_view(&self, log: Log) -> Result<LogView, IndexError> {
        let topics = self
            .children_of(LOG_TOPICS, &log.key())?
            .into_iter()
            .map(|(_, topic)| Topic { topic })
            .collect();
        Ok(LogView { log, topics })
    }

    pub(crate) fn receipt_view(&self, key: &ReceiptKey) -> Result<ReceiptView, IndexError> {
        let receipt = self
            .receipt(key)?
            .ok_or_else(|| IndexError::not_found("receipt", key.to_string()))?;
        let logs = self
            .logs_of_receipt(key)?
            .into_iter()
            .map(|log| self.log_view(log))
            .collect::<Result<_, _>>()?;
        Ok(ReceiptView { receipt, logs })
    }
}

impl<R: KeyValueRead> HeaderSource for EntityReader<'_, R> {
    fn find_header(&self, hash: &Hash) -> Result<Option<Header>, IndexError> {
        self.header(hash)
    }
}
