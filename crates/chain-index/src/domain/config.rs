//! # Index Configuration
//!
//! All configuration values have defaults suitable for Ethereum-style chains.

use crate::domain::ordering::MAX_LOG_TOPIC_INDEX;

/// Configuration for the chain index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of topics per log (default: 4). Values above 4 are
    /// treated as 4.
    pub max_log_topics: u32,

    /// Maximum number of non-canonical headers walked while looking for a
    /// fork point (default: 4096).
    pub max_reorg_depth: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_log_topics: MAX_LOG_TOPIC_INDEX + 1,
            max_reorg_depth: 4096,
        }
    }
}

impl IndexConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of topics per log.
    pub fn with_max_log_topics(mut self, max_log_topics: u32) -> Self {
        self.max_log_topics = max_log_topics;
        self
    }

    /// Set the maximum reorganization depth.
    pub fn with_max_reorg_depth(mut self, depth: u64) -> Self {
        self.max_reorg_depth = depth;
        self
    }

    /// Highest permitted log-topic index, or `None` when logs carry no topics.
    ///
    /// Never above `MAX_LOG_TOPIC_INDEX`.
    pub fn max_log_topic_index(&self) -> Option<u32> {
        self.max_log_topics
            .checked_sub(1)
            .map(|max| max.min(MAX_LOG_TOPIC_INDEX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.max_log_topics, 4);
        assert_eq!(config.max_log_topic_index(), Some(3));
    }

    #[test]
    fn test_builders() {
        let config = IndexConfig::new()
            .with_max_log_topics(0)
            .with_max_reorg_depth(16);
        assert_eq!(config.max_log_topic_index(), None);
        assert_eq!(config.max_reorg_depth, 16);
    }

    #[test]
    fn test_topic_bound_cannot_be_raised() {
        let config = IndexConfig::new().with_max_log_topics(10);
        assert_eq!(config.max_log_topic_index(), Some(MAX_LOG_TOPIC_INDEX));
        let config = IndexConfig::new().with_max_log_topics(2);
        assert_eq!(config.max_log_topic_index(), Some(1));
    }
}
