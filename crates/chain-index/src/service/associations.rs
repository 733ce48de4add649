//! # Ordered Association Implementation
//!
//! Staged writes of slot and member rows, with the foreign-key checks of each
//! association.

use shared_types::{short_hex, Hash};
use tracing::debug;

use crate::domain::config::IndexConfig;
use crate::domain::entities::LogKey;
use crate::domain::errors::IndexError;
use crate::domain::keys::StorageKey;
use crate::domain::ordering::{
    AssociationKind, OrderedAssociation, BLOCK_TRANSACTIONS, BLOCK_UNCLES, LOG_TOPICS,
};
use crate::ports::inbound::OrderedAssociationApi;
use crate::ports::outbound::{KeyValueRead, KeyValueStore};

use super::reader::EntityReader;
use super::staging::StagedBatch;
use super::ChainIndexService;

/// Stage one association row after checking its index.
///
/// Foreign keys are the caller's concern.
pub(super) fn stage_association<R, P, C>(
    batch: &mut StagedBatch<'_, R>,
    association: OrderedAssociation<P, C>,
    parent: &P,
    child: &C,
    index: i64,
) -> Result<u32, IndexError>
where
    R: KeyValueRead,
    P: StorageKey,
    C: StorageKey,
{
    let idx = association.validate_index(index)?;
    let slot = association.slot_key(parent, idx);
    if batch.exists(&slot)? {
        return Err(IndexError::DuplicateIndex {
            association: association.kind(),
            parent: association.parent_label(parent),
            index: idx,
        });
    }
    if let Some(pair) = association.pair_key(parent, child) {
        if batch.exists(&pair)? {
            return Err(IndexError::constraint(
                association.kind().name(),
                format!(
                    "{} already under {}",
                    short_hex(&child.to_key_bytes()),
                    association.parent_label(parent)
                ),
            ));
        }
    }

    batch.put(slot, child.to_key_bytes());
    batch.put(
        association.member_key(child, parent, idx),
        idx.to_be_bytes().to_vec(),
    );
    Ok(idx)
}

/// The log-topic association bounded by `config`.
pub(super) fn log_topic_association(
    config: &IndexConfig,
    index: i64,
) -> Result<OrderedAssociation<LogKey, Hash>, IndexError> {
    config
        .max_log_topic_index()
        .map(|max| LOG_TOPICS.with_max_index(max))
        .ok_or(IndexError::RangeError {
            association: AssociationKind::LogTopic,
            index,
            max: 0,
        })
}

pub(super) fn stage_block_transaction<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    block_hash: &Hash,
    transaction_hash: &Hash,
    idx: i64,
) -> Result<u32, IndexError> {
    let reader = EntityReader::new(&*batch);
    if !reader.block_exists(block_hash)? {
        return Err(missing("block transaction", "block", block_hash));
    }
    if reader.transaction(transaction_hash)?.is_none() {
        return Err(missing("block transaction", "transaction", transaction_hash));
    }
    stage_association(batch, BLOCK_TRANSACTIONS, block_hash, transaction_hash, idx)
}

pub(super) fn stage_block_uncle<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    block_hash: &Hash,
    uncle_hash: &Hash,
    idx: i64,
) -> Result<u32, IndexError> {
    if block_hash == uncle_hash {
        return Err(IndexError::constraint(
            "block uncle",
            format!("{} cannot be its own uncle", short_hex(block_hash)),
        ));
    }
    let reader = EntityReader::new(&*batch);
    if !reader.block_exists(block_hash)? {
        return Err(missing("block uncle", "block", block_hash));
    }
    if !reader.header_exists(uncle_hash)? {
        return Err(missing("block uncle", "uncle header", uncle_hash));
    }
    stage_association(batch, BLOCK_UNCLES, block_hash, uncle_hash, idx)
}

pub(super) fn stage_log_topic<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    config: &IndexConfig,
    log: &LogKey,
    topic: &Hash,
    idx: i64,
) -> Result<u32, IndexError> {
    let association = log_topic_association(config, idx)?;
    let reader = EntityReader::new(&*batch);
    if reader.log(log)?.is_none() {
        return Err(IndexError::constraint("log topic", format!("{log} is not stored")));
    }
    if !reader.topic_exists(topic)? {
        return Err(missing("log topic", "topic", topic));
    }
    stage_association(batch, association, log, topic, idx)
}

fn missing(entity: &'static str, what: &str, hash: &Hash) -> IndexError {
    IndexError::constraint(entity, format!("{what} {} is not stored", short_hex(hash)))
}

impl<KV: KeyValueStore> OrderedAssociationApi for ChainIndexService<KV> {
    fn add_block_transaction(
        &mut self,
        block_hash: &Hash,
        transaction_hash: &Hash,
        idx: i64,
    ) -> Result<(), IndexError> {
        let idx = self.write_with(|batch, _| {
            stage_block_transaction(batch, block_hash, transaction_hash, idx)
        })?;
        debug!(
            "[chain-index] transaction {} at {} of block {}",
            short_hex(transaction_hash),
            idx,
            short_hex(block_hash)
        );
        Ok(())
    }

    fn add_block_uncle(
        &mut self,
        block_hash: &Hash,
        uncle_hash: &Hash,
        idx: i64,
    ) -> Result<(), IndexError> {
        let idx =
            self.write_with(|batch, _| stage_block_uncle(batch, block_hash, uncle_hash, idx))?;
        debug!(
            "[chain-index] uncle {} at {} of block {}",
            short_hex(uncle_hash),
            idx,
            short_hex(block_hash)
        );
        Ok(())
    }

    fn add_log_topic(&mut self, log: &LogKey, topic: &Hash, idx: i64) -> Result<(), IndexError> {
        let idx =
            self.write_with(|batch, config| stage_log_topic(batch, config, log, topic, idx))?;
        debug!("[chain-index] topic {} at {} of {}", short_hex(topic), idx, log);
        Ok(())
    }

    fn block_transactions(&self, block_hash: &Hash) -> Result<Vec<(u32, Hash)>, IndexError> {
        let reader = self.reader();
        if !reader.block_exists(block_hash)? {
            return Err(IndexError::not_found("block", short_hex(block_hash)));
        }
        reader.children_of(BLOCK_TRANSACTIONS, block_hash)
    }

    fn block_uncles(&self, block_hash: &Hash) -> Result<Vec<(u32, Hash)>, IndexError> {
        let reader = self.reader();
        if !reader.block_exists(block_hash)? {
            return Err(IndexError::not_found("block", short_hex(block_hash)));
        }
        reader.children_of(BLOCK_UNCLES, block_hash)
    }

    fn log_topics(&self, log: &LogKey) -> Result<Vec<(u32, Hash)>, IndexError> {
        let reader = self.reader();
        if reader.log(log)?.is_none() {
            return Err(IndexError::not_found("log", log.to_string()));
        }
        reader.children_of(LOG_TOPICS, log)
    }
}
