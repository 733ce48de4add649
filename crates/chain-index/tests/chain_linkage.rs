//! # Chain Linkage Tests
//!
//! Parent resolution, out-of-order ingestion and reorganizations against the
//! in-memory store.

use chain_index::test_utils::{chain, fork_from, h, make_header, unit_with_logs};
use chain_index::{
    Attachment, BlockUnit, ChainIndexService, ChainLinkageApi, EntityStoreApi, Header,
    InMemoryKVStore, IndexConfig, IndexError, ParentLink, ReorgOutcome, U256,
};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn make_index() -> ChainIndexService<InMemoryKVStore> {
    init_tracing();
    ChainIndexService::new_in_memory(IndexConfig::default())
}

/// Chain A: genesis plus canonical blocks 1..=5.
/// Chain B: blocks 4'..=6' on top of A3, not canonical yet.
fn two_forks() -> (ChainIndexService<InMemoryKVStore>, Vec<Header>, Vec<Header>) {
    let mut index = make_index();
    let a = chain(1, 0, 6);
    for header in &a {
        index.insert_header(header.clone()).unwrap();
    }
    let b = fork_from(&a[3], 2, 3);
    for header in &b {
        index.insert_header(header.clone()).unwrap();
    }
    index.reorganize(&a[5].hash, U256::from(10u64)).unwrap();
    (index, a, b)
}

// =============================================================================
// ATTACH / DETACH
// =============================================================================

#[test]
fn test_genesis_has_no_parent_and_is_canonical() {
    let mut index = make_index();
    let genesis = chain(1, 0, 1).remove(0);
    index
        .insert_block_unit(BlockUnit::new(genesis.clone()))
        .unwrap();

    let stored = index.header(&genesis.hash).unwrap();
    assert!(stored.is_genesis());
    assert!(stored.is_canonical);
    assert_eq!(stored.parent_hash, None);
    assert_eq!(stored.detached_parent_hash, None);
    assert_eq!(index.canonical_hash_at(0).unwrap(), Some(genesis.hash));
}

#[test]
fn test_detached_header_resolves_when_parent_arrives() {
    let mut index = make_index();
    let headers = chain(1, 0, 4);
    index
        .insert_block_unit(BlockUnit::new(headers[0].clone()))
        .unwrap();

    // Blocks 3 and 2 arrive before block 1.
    let attachment = index
        .insert_block_unit(BlockUnit::new(headers[3].clone()))
        .unwrap();
    assert_eq!(
        attachment,
        Attachment::Detached {
            parent: headers[2].hash
        }
    );
    index
        .insert_block_unit(BlockUnit::new(headers[2].clone()))
        .unwrap();

    let three = index.header(&headers[3].hash).unwrap();
    assert_eq!(three.parent_link().unwrap(), ParentLink::Resolved(headers[2].hash));

    let two = index.header(&headers[2].hash).unwrap();
    assert!(two.is_detached());
    assert_eq!(two.detached_parent_hash, Some(headers[1].hash));

    index
        .insert_block_unit(BlockUnit::new(headers[1].clone()))
        .unwrap();
    let two = index.header(&headers[2].hash).unwrap();
    assert!(!two.is_detached());
    assert_eq!(two.parent_hash, Some(headers[1].hash));
    assert!(index.pending_children(&headers[1].hash).unwrap().is_empty());
}

#[test]
fn test_header_with_both_parents_leaves_no_row() {
    let mut index = make_index();
    let genesis = chain(1, 0, 1).remove(0);
    index.insert_header(genesis.clone()).unwrap();
    let keys_before = index.store().len();

    let mut header = Header::new(h(1, 1), genesis.hash, 1);
    header.detached_parent_hash = Some(h(7, 0));

    let err = index.insert_header(header.clone()).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));
    let err = index.attach(header.clone()).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));
    let err = index.insert_block_unit(BlockUnit::new(header)).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));

    assert_eq!(index.store().len(), keys_before);
    assert!(index.header(&h(1, 1)).unwrap_err().is_not_found());
}

#[test]
fn test_detached_parent_already_stored_is_rejected() {
    let mut index = make_index();
    let genesis = chain(1, 0, 1).remove(0);
    index.insert_header(genesis.clone()).unwrap();

    let mut header = Header::new(h(1, 1), genesis.hash, 1);
    header.parent_hash = None;
    header.detached_parent_hash = Some(genesis.hash);
    assert!(index.insert_header(header).is_err());
}

#[test]
fn test_child_must_be_numbered_after_its_parent() {
    let mut index = make_index();
    let a = chain(1, 0, 8);
    for header in &a {
        index.insert_header(header.clone()).unwrap();
    }
    let keys_before = index.store().len();

    // A child of #7 claiming #3.
    let stray = make_header(2, 3, a[7].hash);
    let err = index.insert_header(stray.clone()).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { entity: "header", .. }));
    let err = index.attach(stray.clone()).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));
    let err = index.insert_block_unit(BlockUnit::new(stray)).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));

    // A child sharing its parent's number.
    let x = fork_from(&a[0], 3, 1).remove(0);
    index.insert_header(x.clone()).unwrap();
    let keys_with_x = index.store().len();
    let twin = make_header(4, 1, x.hash);
    assert!(index.insert_header(twin).is_err());
    assert_eq!(index.store().len(), keys_with_x);
    assert!(keys_with_x > keys_before);

    index.reorganize(&a[7].hash, U256::from(5u64)).unwrap();
    assert!(index
        .reorganize(&x.hash, U256::from(6u64))
        .unwrap()
        .is_reorganized());
    for number in 0..=7 {
        let canonical = index
            .headers_at_number(number)
            .unwrap()
            .into_iter()
            .filter(|header| header.is_canonical)
            .count();
        assert!(canonical <= 1, "#{number} has {canonical} canonical headers");
    }
    assert_eq!(index.canonical_hash_at(1).unwrap(), Some(x.hash));
}

#[test]
fn test_misnumbered_detached_child_stays_detached() {
    let mut index = make_index();
    let genesis = chain(1, 0, 1).remove(0);
    index.insert_header(genesis.clone()).unwrap();

    let parent = make_header(2, 1, genesis.hash);
    let good = make_header(2, 2, parent.hash);
    let bad = make_header(3, 5, parent.hash);
    index.attach(good.clone()).unwrap();
    index.attach(bad.clone()).unwrap();

    let attachment = index.attach(parent.clone()).unwrap();
    assert_eq!(attachment, Attachment::Attached { parent: genesis.hash });

    assert!(!index.header(&good.hash).unwrap().is_detached());
    let bad_stored = index.header(&bad.hash).unwrap();
    assert!(bad_stored.is_detached());
    assert_eq!(bad_stored.detached_parent_hash, Some(parent.hash));
    assert_eq!(index.pending_children(&parent.hash).unwrap(), vec![bad.hash]);
    assert!(index.resolve_pending(&parent.hash).unwrap().is_empty());
}

// =============================================================================
// REORGANIZATION
// =============================================================================

#[test]
fn test_heavier_fork_replaces_canonical_suffix() {
    let (mut index, a, b) = two_forks();

    let outcome = index.reorganize(&b[2].hash, U256::from(20u64)).unwrap();
    assert_eq!(
        outcome,
        ReorgOutcome::Reorganized {
            fork_point: Some(a[3].hash),
            retracted: vec![a[4].hash, a[5].hash],
            enacted: vec![b[0].hash, b[1].hash, b[2].hash],
        }
    );

    for header in &a[..4] {
        assert!(index.header(&header.hash).unwrap().is_canonical);
    }
    for header in &a[4..] {
        assert!(!index.header(&header.hash).unwrap().is_canonical);
    }
    for header in &b {
        let stored = index.header(&header.hash).unwrap();
        assert!(stored.is_canonical);
        assert_eq!(index.canonical_hash_at(stored.block_number).unwrap(), Some(header.hash));
    }
    assert_eq!(index.canonical_head().unwrap().unwrap().hash, b[2].hash);
    assert_eq!(index.head_weight().unwrap().unwrap().weight, U256::from(20u64));
}

#[test]
fn test_reorganize_is_idempotent() {
    let (mut index, _a, b) = two_forks();
    index.reorganize(&b[2].hash, U256::from(20u64)).unwrap();
    let snapshot = index.store().clone();
    let batches = index.store().batches_written();

    let outcome = index.reorganize(&b[2].hash, U256::from(20u64)).unwrap();
    assert_eq!(outcome, ReorgOutcome::AlreadyCanonical { head: b[2].hash });
    assert_eq!(index.store().batches_written(), batches);
    assert_eq!(index.store().len(), snapshot.len());
}

#[test]
fn test_equal_weight_keeps_incumbent() {
    let (mut index, a, b) = two_forks();

    let outcome = index.reorganize(&b[2].hash, U256::from(10u64)).unwrap();
    assert!(matches!(outcome, ReorgOutcome::Ignored { .. }));
    assert!(index.header(&a[5].hash).unwrap().is_canonical);
    assert!(!index.header(&b[2].hash).unwrap().is_canonical);

    // And back: the retracted fork does not return on a tie either.
    index.reorganize(&b[2].hash, U256::from(20u64)).unwrap();
    let outcome = index.reorganize(&a[5].hash, U256::from(20u64)).unwrap();
    assert!(!outcome.is_reorganized());
    assert!(!index.header(&a[5].hash).unwrap().is_canonical);
}

#[test]
fn test_shorter_heavier_fork_retracts_longer_chain() {
    let (mut index, a, b) = two_forks();
    let outcome = index.reorganize(&b[0].hash, U256::from(50u64)).unwrap();

    match outcome {
        ReorgOutcome::Reorganized {
            retracted, enacted, ..
        } => {
            assert_eq!(retracted, vec![a[4].hash, a[5].hash]);
            assert_eq!(enacted, vec![b[0].hash]);
        }
        other => panic!("Expected Reorganized, got {other:?}"),
    }
    assert_eq!(index.canonical_hash_at(5).unwrap(), None);
    assert_eq!(index.canonical_head().unwrap().unwrap().hash, b[0].hash);
}

#[test]
fn test_disconnected_head_rejected_without_changes() {
    let (mut index, a, _b) = two_forks();
    let orphan_parent = h(9, 7);
    let orphan = Header::new(h(9, 8), orphan_parent, 8);
    index.attach(orphan.clone()).unwrap();
    let batches = index.store().batches_written();

    let err = index.reorganize(&orphan.hash, U256::from(99u64)).unwrap_err();
    assert!(err.to_string().contains("not connected"));
    assert_eq!(index.store().batches_written(), batches);
    assert!(index.header(&a[5].hash).unwrap().is_canonical);
}

#[test]
fn test_reorg_depth_bound() {
    init_tracing();
    let mut index =
        ChainIndexService::new_in_memory(IndexConfig::new().with_max_reorg_depth(2));
    let a = chain(1, 0, 2);
    for header in &a {
        index.insert_header(header.clone()).unwrap();
    }
    let b = fork_from(&a[0], 2, 3);
    for header in &b {
        index.insert_header(header.clone()).unwrap();
    }

    let err = index.reorganize(&b[2].hash, U256::from(5u64)).unwrap_err();
    assert!(matches!(err, IndexError::ConstraintViolation { .. }));
    assert!(index.reorganize(&b[1].hash, U256::from(5u64)).unwrap().is_reorganized());
}

#[test]
fn test_unknown_head_is_not_found() {
    let (mut index, _a, _b) = two_forks();
    let err = index.reorganize(&h(8, 8), U256::from(1u64)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_fork_blocks_keep_their_receipts() {
    let mut index = make_index();
    let a = chain(1, 0, 5);
    for header in &a[..4] {
        index.insert_header(header.clone()).unwrap();
    }
    let b = fork_from(&a[3], 2, 1);

    index
        .insert_block_unit(unit_with_logs(a[4].clone(), &[1], &[[0xEE; 32]]))
        .unwrap();
    index
        .insert_block_unit(unit_with_logs(b[0].clone(), &[1], &[[0xEE; 32]]))
        .unwrap();
    index.reorganize(&b[0].hash, U256::from(3u64)).unwrap();

    let tx_hash = chain_index::test_utils::transaction(1).hash;
    let receipts = index.receipts_for_transaction(&tx_hash).unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(index.transaction_blocks(&tx_hash).unwrap().len(), 2);
    assert!(!index.header(&a[4].hash).unwrap().is_canonical);
    assert!(index.block(&a[4].hash).is_ok());
}
