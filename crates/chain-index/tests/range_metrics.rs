//! # Range Metrics Tests

use chain_index::test_utils::{chain, fork_from, unit_with_logs};
use chain_index::{
    ChainIndexService, ChainLinkageApi, EntityStoreApi, Hash, InMemoryKVStore, IndexConfig,
    RangeCounts, RangeMetricsApi, U256,
};

const TOPIC: Hash = [0x70; 32];

/// Genesis plus canonical headers 1..=10; block 5 has one uncle and two
/// transactions, each with one log carrying one topic.
fn populated_index() -> ChainIndexService<InMemoryKVStore> {
    let mut index = ChainIndexService::new_in_memory(IndexConfig::default());
    let headers = chain(1, 0, 11);
    for header in &headers[..5] {
        index.insert_header(header.clone()).unwrap();
    }

    let uncle = fork_from(&headers[3], 3, 1).remove(0);
    let unit = unit_with_logs(headers[5].clone(), &[1, 2], &[TOPIC]).with_uncle(uncle, 0);
    index.insert_block_unit(unit).unwrap();

    for header in &headers[6..] {
        index.insert_header(header.clone()).unwrap();
    }
    index
}

#[test]
fn test_weighted_count_over_full_range() {
    let index = populated_index();

    let counts = index.range_counts(0, 10).unwrap();
    assert_eq!(
        counts,
        RangeCounts {
            headers: 10,
            uncles: 1,
            transactions: 2,
            logs: 2,
            log_topics: 2,
        }
    );
    assert_eq!(index.weighted_count(0, 10).unwrap(), 34);
}

#[test]
fn test_range_is_half_open() {
    let index = populated_index();

    // Block 5 sits outside (5, 10].
    assert_eq!(index.weighted_count(5, 10).unwrap(), 10);
    // (4, 5] is block 5 alone: 2 + 2 + 6 + 4 + 2.
    assert_eq!(index.weighted_count(4, 5).unwrap(), 16);
}

#[test]
fn test_retracted_blocks_stop_counting() {
    let mut index = populated_index();
    let headers = chain(1, 0, 11);
    index.reorganize(&headers[10].hash, U256::from(10u64)).unwrap();

    let fork = fork_from(&headers[4], 2, 7);
    for header in &fork {
        index.insert_header(header.clone()).unwrap();
    }
    index
        .reorganize(&fork[6].hash, U256::from(11u64))
        .unwrap();

    // Blocks 1..=4 of chain A plus 5..=11 of the fork, all headers only.
    assert_eq!(index.weighted_count(0, 11).unwrap(), 22);
}
