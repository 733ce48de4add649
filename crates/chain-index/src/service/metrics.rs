//! # Range Metrics Implementation
//!
//! Counts rows hanging off the canonical blocks of a range. Reads only
//! committed data, so a unit is counted entirely or not at all.

use shared_types::Hash;

use crate::domain::errors::IndexError;
use crate::domain::keys::KeyPrefix;
use crate::domain::metrics::{inclusive_bounds, RangeCounts};
use crate::domain::ordering::{BLOCK_TRANSACTIONS, BLOCK_UNCLES};
use crate::ports::inbound::RangeMetricsApi;
use crate::ports::outbound::{KeyValueRead, KeyValueStore};

use super::reader::EntityReader;
use super::ChainIndexService;

/// Rows of one canonical header.
fn block_counts<R: KeyValueRead>(
    reader: &EntityReader<'_, R>,
    hash: &Hash,
) -> Result<RangeCounts, IndexError> {
    Ok(RangeCounts {
        headers: 1,
        uncles: reader.count_prefix(&BLOCK_UNCLES.slot_prefix(hash))?,
        transactions: reader.count_prefix(&BLOCK_TRANSACTIONS.slot_prefix(hash))?,
        // Log and log-topic keys lead with the block hash.
        logs: reader.count_prefix(&KeyPrefix::Log.key(hash))?,
        log_topics: reader.count_prefix(&KeyPrefix::LogTopic.key(hash))?,
    })
}

impl<KV: KeyValueStore> RangeMetricsApi for ChainIndexService<KV> {
    fn range_counts(&self, start: u64, end: u64) -> Result<RangeCounts, IndexError> {
        let Some((from, to)) = inclusive_bounds(start, end) else {
            return Ok(RangeCounts::default());
        };

        let reader = self.reader();
        let mut counts = RangeCounts::default();
        for (_, hash) in reader.canonical_range(from, to)? {
            counts.add(block_counts(&reader, &hash)?);
        }
        tracing::debug!(
            "[chain-index] range ({}, {}]: {:?} -> {}",
            start,
            end,
            counts,
            counts.weighted_total()
        );
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::IndexConfig;
    use crate::ports::inbound::EntityStoreApi;
    use crate::test_utils::chain;

    #[test]
    fn test_headers_only() {
        let mut index = ChainIndexService::new_in_memory(IndexConfig::default());
        for header in chain(1, 0, 6) {
            index.insert_header(header).unwrap();
        }

        // Blocks 1..=5; genesis sits on the open end.
        assert_eq!(index.weighted_count(0, 5).unwrap(), 10);
        assert_eq!(index.weighted_count(2, 3).unwrap(), 2);
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let mut index = ChainIndexService::new_in_memory(IndexConfig::default());
        for header in chain(1, 0, 3) {
            index.insert_header(header).unwrap();
        }
        assert_eq!(index.weighted_count(2, 2).unwrap(), 0);
        assert_eq!(index.weighted_count(2, 1).unwrap(), 0);
        assert_eq!(index.weighted_count(50, 60).unwrap(), 0);
    }
}
