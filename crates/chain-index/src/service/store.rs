//! # Entity Store Implementation
//!
//! Constrained inserts and materialized lookups.

use shared_types::{short_hex, Hash};
use tracing::info;

use crate::domain::config::IndexConfig;
use crate::domain::entities::{
    Block, BlockView, Header, Log, LogKey, LogView, Receipt, ReceiptKey, ReceiptView, Topic,
    Transaction,
};
use crate::domain::errors::IndexError;
use crate::domain::keys::KeyPrefix;
use crate::domain::linkage::Attachment;
use crate::domain::ordering::{BLOCK_TRANSACTIONS, BLOCK_UNCLES, LOG_TOPICS};
use crate::domain::unit::BlockUnit;
use crate::ports::inbound::EntityStoreApi;
use crate::ports::outbound::{KeyValueRead, KeyValueStore};

use super::associations::{stage_block_transaction, stage_block_uncle, stage_log_topic};
use super::linkage::{stage_attach, stage_header};
use super::reader::EntityReader;
use super::staging::StagedBatch;
use super::ChainIndexService;

fn stage_transaction<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    transaction: &Transaction,
) -> Result<(), IndexError> {
    let reader = EntityReader::new(&*batch);
    if reader.transaction(&transaction.hash)?.is_some() {
        return Err(IndexError::constraint(
            "transaction",
            format!("{} already stored", short_hex(&transaction.hash)),
        ));
    }
    if let Some(block) = &transaction.block_header_hash {
        if !reader.block_exists(block)? {
            return Err(IndexError::constraint(
                "transaction",
                format!(
                    "block {} of {} is not stored",
                    short_hex(block),
                    short_hex(&transaction.hash)
                ),
            ));
        }
    }
    batch.put_value(KeyPrefix::transaction_key(&transaction.hash), transaction)
}

/// Stage a topic value. Returns `false` if it was already present.
fn stage_topic<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    topic: &Topic,
) -> Result<bool, IndexError> {
    if EntityReader::new(&*batch).topic_exists(&topic.topic)? {
        return Ok(false);
    }
    batch.put_value(KeyPrefix::topic_key(&topic.topic), topic)?;
    Ok(true)
}

fn stage_receipt<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    block_hash: &Hash,
    receipt: &Receipt,
) -> Result<(), IndexError> {
    let key = receipt.key();
    if receipt.block_header_hash != *block_hash {
        return Err(IndexError::constraint(
            "receipt",
            format!("{key} does not belong to block {}", short_hex(block_hash)),
        ));
    }
    let reader = EntityReader::new(&*batch);
    let included = BLOCK_TRANSACTIONS
        .pair_key(block_hash, &receipt.transaction_hash)
        .map(|pair| reader.exists(&pair))
        .transpose()?
        .unwrap_or(false);
    if !included {
        return Err(IndexError::constraint(
            "receipt",
            format!("{key}: transaction is not part of the block"),
        ));
    }
    if reader.receipt(&key)?.is_some() {
        return Err(IndexError::constraint(
            "receipt",
            format!("{key} already stored"),
        ));
    }
    batch.put(KeyPrefix::receipt_by_transaction_key(&key), Vec::new());
    batch.put_value(KeyPrefix::receipt_key(&key), receipt)
}

fn stage_log<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    block_hash: &Hash,
    log: &Log,
) -> Result<(), IndexError> {
    let key = log.key();
    if log.block_header_hash != *block_hash {
        return Err(IndexError::constraint(
            "log",
            format!("{key} does not belong to block {}", short_hex(block_hash)),
        ));
    }
    let reader = EntityReader::new(&*batch);
    if reader.receipt(&log.receipt_key())?.is_none() {
        return Err(IndexError::constraint(
            "log",
            format!("{key}: receipt is not stored"),
        ));
    }
    if reader.log(&key)?.is_some() {
        return Err(IndexError::constraint("log", format!("{key} already stored")));
    }
    batch.put_value(KeyPrefix::log_key(&key), log)
}

/// Stage every row of a block unit.
fn stage_block_unit<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    config: &IndexConfig,
    unit: BlockUnit,
) -> Result<Attachment, IndexError> {
    let BlockUnit {
        header,
        uncles,
        block_uncles,
        transactions,
        block_transactions,
        receipts,
        logs,
        topics,
        log_topics,
    } = unit;
    let block_hash = header.hash;

    let reader = EntityReader::new(&*batch);
    if reader.block_exists(&block_hash)? {
        return Err(IndexError::constraint(
            "block",
            format!("{} already stored", short_hex(&block_hash)),
        ));
    }
    // A header seen earlier (as an uncle, or on its own) is completed into a block.
    let attachment = match reader.header(&block_hash)? {
        Some(stored) => Attachment::from(stored.parent_link()?),
        None => stage_attach(batch, header)?,
    };
    batch.put_value(
        KeyPrefix::block_key(&block_hash),
        &Block {
            header_hash: block_hash,
        },
    )?;

    for uncle in uncles {
        if !EntityReader::new(&*batch).header_exists(&uncle.hash)? {
            stage_attach(batch, uncle)?;
        }
    }
    for row in &block_uncles {
        ensure_same_block("block uncle", &block_hash, &row.block_header_hash)?;
        stage_block_uncle(batch, &block_hash, &row.uncle_hash, row.idx)?;
    }

    for transaction in &transactions {
        if EntityReader::new(&*batch)
            .transaction(&transaction.hash)?
            .is_none()
        {
            stage_transaction(batch, transaction)?;
        }
    }
    for row in &block_transactions {
        ensure_same_block("block transaction", &block_hash, &row.block_header_hash)?;
        stage_block_transaction(batch, &block_hash, &row.transaction_hash, row.idx)?;
    }

    for receipt in &receipts {
        stage_receipt(batch, &block_hash, receipt)?;
    }
    for log in &logs {
        stage_log(batch, &block_hash, log)?;
    }
    for topic in &topics {
        stage_topic(batch, topic)?;
    }
    for row in &log_topics {
        ensure_same_block("log topic", &block_hash, &row.log.block_header_hash)?;
        stage_log_topic(batch, config, &row.log, &row.topic, row.idx)?;
    }

    Ok(attachment)
}

fn ensure_same_block(entity: &'static str, block_hash: &Hash, row_block: &Hash) -> Result<(), IndexError> {
    if block_hash == row_block {
        Ok(())
    } else {
        Err(IndexError::constraint(
            entity,
            format!(
                "row for block {} in unit of block {}",
                short_hex(row_block),
                short_hex(block_hash)
            ),
        ))
    }
}

impl<KV: KeyValueStore> EntityStoreApi for ChainIndexService<KV> {
    fn insert_header(&mut self, header: Header) -> Result<Attachment, IndexError> {
        let hash = header.hash;
        let number = header.block_number;
        let attachment = self.write_with(|batch, _| stage_header(batch, header))?;
        info!(
            "[chain-index] header #{} stored: {} ({:?})",
            number,
            short_hex(&hash),
            attachment
        );
        Ok(attachment)
    }

    fn insert_transaction(&mut self, transaction: Transaction) -> Result<(), IndexError> {
        self.write_with(|batch, _| stage_transaction(batch, &transaction))
    }

    fn insert_topic(&mut self, topic: Topic) -> Result<bool, IndexError> {
        self.write_with(|batch, _| stage_topic(batch, &topic))
    }

    fn insert_block_unit(&mut self, unit: BlockUnit) -> Result<Attachment, IndexError> {
        let hash = unit.hash();
        let number = unit.header.block_number;
        let transactions = unit.block_transactions.len();
        let rows = unit.row_count();
        let attachment = self.write_with(|batch, config| stage_block_unit(batch, config, unit))?;
        info!(
            "[chain-index] block #{} stored: {}, txs: {}, rows: {} ({:?})",
            number,
            short_hex(&hash),
            transactions,
            rows,
            attachment
        );
        Ok(attachment)
    }

    fn header(&self, hash: &Hash) -> Result<Header, IndexError> {
        self.reader().require_header(hash)
    }

    fn headers_at_number(&self, number: u64) -> Result<Vec<Header>, IndexError> {
        self.reader().headers_at_number(number)
    }

    fn block(&self, hash: &Hash) -> Result<BlockView, IndexError> {
        self.reader().block_view(hash)
    }

    fn transaction(&self, hash: &Hash) -> Result<Transaction, IndexError> {
        self.reader().require_transaction(hash)
    }

    fn transaction_blocks(&self, transaction_hash: &Hash) -> Result<Vec<Hash>, IndexError> {
        let reader = self.reader();
        reader.require_transaction(transaction_hash)?;
        reader.parents_of(BLOCK_TRANSACTIONS, transaction_hash)
    }

    fn receipt(&self, key: &ReceiptKey) -> Result<ReceiptView, IndexError> {
        self.reader().receipt_view(key)
    }

    fn receipts_for_transaction(
        &self,
        transaction_hash: &Hash,
    ) -> Result<Vec<ReceiptView>, IndexError> {
        let reader = self.reader();
        reader.require_transaction(transaction_hash)?;
        reader
            .receipt_keys_for_transaction(transaction_hash)?
            .iter()
            .map(|key| reader.receipt_view(key))
            .collect()
    }

    fn log(&self, key: &LogKey) -> Result<LogView, IndexError> {
        let reader = self.reader();
        let log = reader
            .log(key)?
            .ok_or_else(|| IndexError::not_found("log", key.to_string()))?;
        reader.log_view(log)
    }

    fn topic(&self, topic: &Hash) -> Result<Topic, IndexError> {
        self.reader()
            .topic(topic)?
            .ok_or_else(|| IndexError::not_found("topic", short_hex(topic)))
    }

    fn logs_with_topic(&self, topic: &Hash) -> Result<Vec<LogKey>, IndexError> {
        let reader = self.reader();
        if !reader.topic_exists(topic)? {
            return Err(IndexError::not_found("topic", short_hex(topic)));
        }
        reader.parents_of(LOG_TOPICS, topic)
    }

    fn uncle_blocks(&self, uncle_hash: &Hash) -> Result<Vec<Hash>, IndexError> {
        let reader = self.reader();
        reader.require_header(uncle_hash)?;
        reader.parents_of(BLOCK_UNCLES, uncle_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryKVStore;
    use crate::domain::entities::ParentLink;
    use crate::test_utils::{chain, h, transaction};

    fn service() -> ChainIndexService<InMemoryKVStore> {
        ChainIndexService::new_in_memory(IndexConfig::default())
    }

    #[test]
    fn test_genesis_insert() {
        let mut index = service();
        let genesis = chain(1, 0, 1).remove(0);
        assert_eq!(
            index.insert_header(genesis.clone()).unwrap(),
            Attachment::Genesis
        );

        let stored = index.header(&genesis.hash).unwrap();
        assert!(stored.is_genesis());
        assert_eq!(stored.parent_link().unwrap(), ParentLink::Genesis);
    }

    #[test]
    fn test_genesis_must_be_canonical() {
        let mut index = service();
        let genesis = chain(1, 0, 1).remove(0).canonical(false);
        assert!(matches!(
            index.insert_header(genesis),
            Err(IndexError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_parentless_non_genesis_rejected() {
        let mut index = service();
        let orphan = Header::new(h(1, 5), [0; 32], 5);
        assert!(matches!(
            index.insert_header(orphan),
            Err(IndexError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_strict_insert_checks_resolved_parent() {
        let mut index = service();
        let headers = chain(1, 0, 2);
        let err = index.insert_header(headers[1].clone()).unwrap_err();
        assert!(err.to_string().contains("is not stored"));
        assert!(index.store().is_empty());
    }

    #[test]
    fn test_second_canonical_header_at_number_rejected() {
        let mut index = service();
        let headers = chain(1, 0, 2);
        index.insert_header(headers[0].clone()).unwrap();
        index.insert_header(headers[1].clone()).unwrap();

        let rival = Header::new(h(2, 1), headers[0].hash, 1).canonical(true);
        assert!(index.insert_header(rival.clone()).is_err());
        assert!(index.insert_header(rival.canonical(false)).is_ok());
        assert_eq!(index.headers_at_number(1).unwrap().len(), 2);
    }

    #[test]
    fn test_orphan_transaction_roundtrip() {
        let mut index = service();
        let tx = transaction(7);
        index.insert_transaction(tx.clone()).unwrap();

        assert_eq!(index.transaction(&tx.hash).unwrap(), tx);
        assert!(index.transaction_blocks(&tx.hash).unwrap().is_empty());
        assert!(index.insert_transaction(tx).is_err());
    }

    #[test]
    fn test_transaction_with_unknown_block_rejected() {
        let mut index = service();
        let mut tx = transaction(7);
        tx.block_header_hash = Some(h(1, 3));
        assert!(matches!(
            index.insert_transaction(tx),
            Err(IndexError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_insert_topic_is_idempotent() {
        let mut index = service();
        let topic = Topic { topic: [3; 32] };
        assert!(index.insert_topic(topic).unwrap());
        assert!(!index.insert_topic(topic).unwrap());
        assert_eq!(index.topic(&[3; 32]).unwrap(), topic);
    }

    #[test]
    fn test_lookups_report_not_found() {
        let index = service();
        assert!(index.header(&h(1, 1)).unwrap_err().is_not_found());
        assert!(index.block(&h(1, 1)).unwrap_err().is_not_found());
        assert!(index.topic(&[1; 32]).unwrap_err().is_not_found());
        assert!(index
            .receipt(&ReceiptKey::new([1; 32], [2; 32]))
            .unwrap_err()
            .is_not_found());
    }
}
