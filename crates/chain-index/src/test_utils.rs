//! Builders for headers, transactions and block units used by the tests.

use shared_types::{Hash, EMPTY_BLOOM, GENESIS_PARENT_HASH, U256};

use crate::domain::entities::{Header, Log, LogKey, Receipt, Transaction};
use crate::domain::unit::BlockUnit;

/// Deterministic hash for block `number` of fork `fork`.
pub fn h(fork: u8, number: u64) -> Hash {
    let mut hash = [0u8; 32];
    hash[0] = fork;
    hash[1..9].copy_from_slice(&number.to_be_bytes());
    hash[31] = 0xAA;
    hash
}

/// Header `number` of fork `fork` with the given wire parent.
pub fn make_header(fork: u8, number: u64, parent_hash: Hash) -> Header {
    let mut header = Header::new(h(fork, number), parent_hash, number);
    header.difficulty = U256::from(1_000u64 + number);
    header.gas_limit = 30_000_000;
    header.timestamp = 1_700_000_000 + number * 12;
    header.bloom = EMPTY_BLOOM;
    header
}

/// `len` canonical headers of fork `fork` starting at `start`.
///
/// A chain starting at 0 begins with a genesis header; otherwise the first
/// header points at `h(fork, start - 1)`.
pub fn chain(fork: u8, start: u64, len: usize) -> Vec<Header> {
    (start..start + len as u64)
        .map(|number| {
            let parent = match number.checked_sub(1) {
                Some(prev) => h(fork, prev),
                None => GENESIS_PARENT_HASH,
            };
            make_header(fork, number, parent).canonical(true)
        })
        .collect()
}

/// `len` non-canonical headers of fork `fork` built on top of `parent`.
pub fn fork_from(parent: &Header, fork: u8, len: usize) -> Vec<Header> {
    let mut parent_hash = parent.hash;
    (1..=len as u64)
        .map(|offset| {
            let header = make_header(fork, parent.block_number + offset, parent_hash);
            parent_hash = header.hash;
            header
        })
        .collect()
}

/// An orphan transaction identified by `seed`.
pub fn transaction(seed: u8) -> Transaction {
    let mut hash = [0u8; 32];
    hash[0] = 0x7C;
    hash[31] = seed;
    Transaction {
        hash,
        nonce: u64::from(seed),
        gas_price: U256::from(20_000_000_000u64),
        gas: 21_000,
        to: Some([seed; 20]),
        value: U256::from(u64::from(seed) * 1_000),
        data: Vec::new(),
        v: [0u8; 32],
        r: [seed; 32],
        s: [seed; 32],
        sender: [0x11; 20],
        block_header_hash: None,
    }
}

pub fn receipt(transaction_hash: Hash, block_header_hash: Hash) -> Receipt {
    Receipt {
        transaction_hash,
        block_header_hash,
        state_root: [0x5E; 32],
        gas_used: 21_000,
        bloom: EMPTY_BLOOM,
    }
}

pub fn log(key: LogKey) -> Log {
    Log {
        idx: key.idx,
        transaction_hash: key.transaction_hash,
        block_header_hash: key.block_header_hash,
        address: [0x42; 20],
        data: vec![key.idx as u8],
    }
}

/// A block unit where transaction `i` sits at index `i`, has a receipt and
/// emits one log carrying `topics`.
pub fn unit_with_logs(header: Header, tx_seeds: &[u8], topics: &[Hash]) -> BlockUnit {
    let block = header.hash;
    let mut unit = BlockUnit::new(header);
    for (i, seed) in tx_seeds.iter().enumerate() {
        let mut tx = transaction(*seed);
        tx.block_header_hash = Some(block);
        let log_key = LogKey::new(block, tx.hash, 0);
        unit = unit
            .with_transaction(tx.clone(), i as i64)
            .with_receipt(receipt(tx.hash, block))
            .with_log(log(log_key));
        for (idx, topic) in topics.iter().enumerate() {
            unit = unit.with_log_topic(log_key, *topic, idx as i64);
        }
    }
    unit
}
