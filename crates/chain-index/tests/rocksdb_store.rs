//! # RocksDB Backend Tests
//!
//! The service over `RocksDbStore`, including a reopen of the same path.

#![cfg(feature = "rocksdb")]

use chain_index::test_utils::{chain, fork_from, unit_with_logs};
use chain_index::{
    ChainIndexService, ChainLinkageApi, EntityStoreApi, IndexConfig, RangeMetricsApi,
    RocksDbConfig, RocksDbStore, U256,
};

fn open(path: &str) -> ChainIndexService<RocksDbStore> {
    let store = RocksDbStore::open(RocksDbConfig::for_testing(path)).unwrap();
    ChainIndexService::new(store, IndexConfig::default())
}

#[test]
fn test_index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    let headers = chain(1, 0, 4);
    {
        let mut index = open(&path);
        index.insert_header(headers[0].clone()).unwrap();
        for header in &headers[1..] {
            index
                .insert_block_unit(unit_with_logs(header.clone(), &[header.block_number as u8], &[[3; 32]]))
                .unwrap();
        }
    }

    let index = open(&path);
    assert_eq!(index.canonical_head().unwrap().unwrap().hash, headers[3].hash);
    assert_eq!(index.weighted_count(0, 3).unwrap(), 24);
    assert_eq!(index.block(&headers[2].hash).unwrap().transactions.len(), 1);
}

#[test]
fn test_reorg_on_rocksdb() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = open(&dir.path().to_string_lossy());
    let a = chain(1, 0, 4);
    for header in &a {
        index.insert_header(header.clone()).unwrap();
    }
    let b = fork_from(&a[1], 2, 3);
    for header in &b {
        index.insert_header(header.clone()).unwrap();
    }

    assert!(index
        .reorganize(&b[2].hash, U256::from(7u64))
        .unwrap()
        .is_reorganized());
    assert_eq!(index.canonical_hash_at(2).unwrap(), Some(b[0].hash));
    assert!(!index.header(&a[3].hash).unwrap().is_canonical);
}
