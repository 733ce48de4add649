//! # Range Metrics
//!
//! Weighted item count over a block-number range, used for progress and
//! backpressure reporting.
//!
//! ```text
//! total = 2·headers + 2·uncles + 3·transactions + 2·logs + 1·log topics
//! ```
//!
//! Association rows are counted with their owning entity; topic values
//! themselves are not counted, only their join rows.

/// Weight of a canonical header.
pub const HEADER_WEIGHT: u64 = 2;
/// Weight of a block-uncle row.
pub const UNCLE_WEIGHT: u64 = 2;
/// Weight of a transaction included in a block.
pub const TRANSACTION_WEIGHT: u64 = 3;
/// Weight of a log.
pub const LOG_WEIGHT: u64 = 2;
/// Weight of a log-topic row.
pub const LOG_TOPIC_WEIGHT: u64 = 1;

/// Per-kind row counts for the canonical blocks of a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeCounts {
    pub headers: u64,
    pub uncles: u64,
    pub transactions: u64,
    pub logs: u64,
    pub log_topics: u64,
}

impl RangeCounts {
    /// Weighted total of all counts.
    pub fn weighted_total(&self) -> u64 {
        HEADER_WEIGHT * self.headers
            + UNCLE_WEIGHT * self.uncles
            + TRANSACTION_WEIGHT * self.transactions
            + LOG_WEIGHT * self.logs
            + LOG_TOPIC_WEIGHT * self.log_topics
    }

    /// Accumulate another block's counts.
    pub fn add(&mut self, other: RangeCounts) {
        self.headers += other.headers;
        self.uncles += other.uncles;
        self.transactions += other.transactions;
        self.logs += other.logs;
        self.log_topics += other.log_topics;
    }
}

/// Bounds of the half-open range `(start, end]`, or `None` when empty.
pub fn inclusive_bounds(start: u64, end: u64) -> Option<(u64, u64)> {
    (start < end).then(|| (start + 1, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_total() {
        let counts = RangeCounts {
            headers: 10,
            uncles: 1,
            transactions: 2,
            logs: 2,
            log_topics: 2,
        };
        assert_eq!(counts.weighted_total(), 34);
    }

    #[test]
    fn test_add_accumulates() {
        let mut total = RangeCounts::default();
        total.add(RangeCounts {
            headers: 1,
            transactions: 4,
            ..Default::default()
        });
        total.add(RangeCounts {
            headers: 1,
            log_topics: 3,
            ..Default::default()
        });
        assert_eq!(total.headers, 2);
        assert_eq!(total.weighted_total(), 2 * 2 + 4 * 3 + 3);
    }

    #[test]
    fn test_half_open_bounds() {
        assert_eq!(inclusive_bounds(0, 10), Some((1, 10)));
        assert_eq!(inclusive_bounds(5, 5), None);
        assert_eq!(inclusive_bounds(6, 5), None);
    }
}
