//! # Ordered Associations
//!
//! One-to-many and many-to-many joins carrying an explicit integer position.
//!
//! ## Rules
//!
//! - An index is unique under its parent (`DuplicateIndex` otherwise).
//! - An index is never negative and never above the association's bound
//!   (`RangeError` otherwise). Only log topics have a finite bound.
//! - Indices may have gaps. Readers return children in stored index order and
//!   never resequence them.
//!
//! ## Layout
//!
//! Each association owns two key spaces:
//!
//! - slot keys `{slot prefix}{parent}{idx}` -> child, scanned for ordered reads;
//! - member keys `{member prefix}{child}{parent}` -> idx, used for reverse
//!   lookups and, for block transactions and uncles, the composite primary key.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use shared_types::Hash;

use crate::domain::entities::LogKey;
use crate::domain::errors::IndexError;
use crate::domain::keys::{trailing_u32, KeyPrefix, StorageKey};

/// Highest topic position within a log.
pub const MAX_LOG_TOPIC_INDEX: u32 = 3;

/// The ordered joins of the chain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// Transactions of a block.
    BlockTransaction,
    /// Uncle headers of a block.
    BlockUncle,
    /// Topics of a log.
    LogTopic,
}

impl AssociationKind {
    /// Default upper bound on the index.
    pub const fn default_max_index(&self) -> u32 {
        match self {
            AssociationKind::LogTopic => MAX_LOG_TOPIC_INDEX,
            AssociationKind::BlockTransaction | AssociationKind::BlockUncle => u32::MAX,
        }
    }

    /// Whether a child may appear at most once per parent.
    pub const fn unique_children(&self) -> bool {
        !matches!(self, AssociationKind::LogTopic)
    }

    pub const fn slot_prefix(&self) -> KeyPrefix {
        match self {
            AssociationKind::BlockTransaction => KeyPrefix::BlockTransaction,
            AssociationKind::BlockUncle => KeyPrefix::BlockUncle,
            AssociationKind::LogTopic => KeyPrefix::LogTopic,
        }
    }

    pub const fn member_prefix(&self) -> KeyPrefix {
        match self {
            AssociationKind::BlockTransaction => KeyPrefix::BlockTransactionMember,
            AssociationKind::BlockUncle => KeyPrefix::BlockUncleMember,
            AssociationKind::LogTopic => KeyPrefix::LogTopicMember,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AssociationKind::BlockTransaction => "block transaction",
            AssociationKind::BlockUncle => "block uncle",
            AssociationKind::LogTopic => "log topic",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed view over one ordered join, parent `P` to child `C`.
#[derive(Debug)]
pub struct OrderedAssociation<P, C> {
    kind: AssociationKind,
    max_index: u32,
    _marker: PhantomData<fn() -> (P, C)>,
}

impl<P, C> Clone for OrderedAssociation<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for OrderedAssociation<P, C> {}

/// Block header hash -> transaction hash.
pub const BLOCK_TRANSACTIONS: OrderedAssociation<Hash, Hash> =
    OrderedAssociation::new(AssociationKind::BlockTransaction);

/// Block header hash -> uncle header hash.
pub const BLOCK_UNCLES: OrderedAssociation<Hash, Hash> =
    OrderedAssociation::new(AssociationKind::BlockUncle);

/// Log key -> topic value.
pub const LOG_TOPICS: OrderedAssociation<LogKey, Hash> =
    OrderedAssociation::new(AssociationKind::LogTopic);

impl<P: StorageKey, C: StorageKey> OrderedAssociation<P, C> {
    pub const fn new(kind: AssociationKind) -> Self {
        Self {
            kind,
            max_index: kind.default_max_index(),
            _marker: PhantomData,
        }
    }

    /// Override the index bound.
    pub const fn with_max_index(mut self, max_index: u32) -> Self {
        self.max_index = max_index;
        self
    }

    pub const fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub const fn max_index(&self) -> u32 {
        self.max_index
    }

    /// Check an incoming index and narrow it to its stored width.
    pub fn validate_index(&self, index: i64) -> Result<u32, IndexError> {
        u32::try_from(index)
            .ok()
            .filter(|idx| *idx <= self.max_index)
            .ok_or(IndexError::RangeError {
                association: self.kind,
                index,
                max: self.max_index,
            })
    }

    /// Prefix of every slot under `parent`.
    pub fn slot_prefix(&self, parent: &P) -> Vec<u8> {
        self.kind.slot_prefix().key_of(parent)
    }

    pub fn slot_key(&self, parent: &P, index: u32) -> Vec<u8> {
        let mut key = self.slot_prefix(parent);
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    /// Prefix of every membership of `child`.
    pub fn member_prefix(&self, child: &C) -> Vec<u8> {
        self.kind.member_prefix().key_of(child)
    }

    /// Membership key. Topics repeat within a log, so their key carries the index.
    pub fn member_key(&self, child: &C, parent: &P, index: u32) -> Vec<u8> {
        let mut key = self.member_prefix(child);
        parent.write_key(&mut key);
        if !self.kind.unique_children() {
            key.extend_from_slice(&index.to_be_bytes());
        }
        key
    }

    /// Key identifying the (parent, child) pair when children are unique.
    pub fn pair_key(&self, parent: &P, child: &C) -> Option<Vec<u8>> {
        self.kind
            .unique_children()
            .then(|| self.member_key(child, parent, 0))
    }

    pub fn decode_slot_index(&self, key: &[u8]) -> Option<u32> {
        trailing_u32(key)
    }

    pub fn decode_child(&self, value: &[u8]) -> Option<C> {
        C::read_key(value)
    }

    /// Parent encoded in a member key.
    pub fn decode_member_parent(&self, key: &[u8]) -> Option<P> {
        let start = self.kind.member_prefix().as_bytes().len() + C::ENCODED_LEN;
        P::read_key(key.get(start..start + P::ENCODED_LEN)?)
    }

    pub fn parent_label(&self, parent: &P) -> String {
        shared_types::short_hex(&parent.to_key_bytes())
    }
}
