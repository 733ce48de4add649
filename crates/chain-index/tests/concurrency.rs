//! # Concurrent Reader Tests
//!
//! One writer and several readers sharing a `SharedChainIndex`. Readers must
//! only ever observe fully committed units.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use chain_index::test_utils::{chain, unit_with_logs};
use chain_index::{
    ChainIndexService, ChainLinkageApi, EntityStoreApi, IndexConfig, RangeMetricsApi,
};

const BLOCKS: usize = 40;

#[test]
fn test_readers_never_see_partial_units() {
    let headers = chain(1, 0, BLOCKS + 1);
    let mut index = ChainIndexService::new_in_memory(IndexConfig::default());
    index.insert_header(headers[0].clone()).unwrap();
    let shared = index.into_shared();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let index = shared.read();
                    let head = index
                        .canonical_head()
                        .unwrap()
                        .map(|header| header.block_number)
                        .unwrap_or(0);
                    // Each unit: header 2, one tx 3, one log 2, one topic 1.
                    let counts = index.range_counts(0, head).unwrap();
                    assert_eq!(counts.weighted_total(), head * 8);
                    assert_eq!(counts.transactions, counts.logs);
                }
            });
        }

        scope.spawn(|| {
            for (i, header) in headers.iter().enumerate().skip(1) {
                let unit = unit_with_logs(header.clone(), &[i as u8], &[[0x99; 32]]);
                shared.write().insert_block_unit(unit).unwrap();
            }
            done.store(true, Ordering::Release);
        });
    });

    let index = shared.read();
    assert_eq!(
        index.canonical_head().unwrap().unwrap().block_number,
        BLOCKS as u64
    );
    assert_eq!(index.weighted_count(0, BLOCKS as u64).unwrap(), BLOCKS as u64 * 8);
}
