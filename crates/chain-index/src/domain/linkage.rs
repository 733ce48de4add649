//! # Chain Linkage Rules
//!
//! Parent resolution and fork-choice planning, independent of storage.
//!
//! ## Attach
//!
//! A header whose parent is stored is linked directly (`Resolved`). A header
//! whose parent is not stored yet keeps the parent hash as `Detached` until
//! the parent arrives and reattaches it.
//!
//! ## Reorganize
//!
//! A heavier head replaces the canonical chain: walk the new branch back to
//! its first canonical ancestor (the fork point), retract every canonical
//! header above the fork point and enact the new branch.

use serde::{Deserialize, Serialize};
use shared_types::{short_hex, Hash, U256};

use crate::domain::entities::{Header, ParentLink};
use crate::domain::errors::IndexError;

/// Read access needed to plan a reorganization.
pub trait HeaderSource {
    /// Look up a stored header.
    fn find_header(&self, hash: &Hash) -> Result<Option<Header>, IndexError>;
}

/// How an incoming header was wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// No parent (block number 0).
    Genesis,
    /// Parent stored; linked directly.
    Attached { parent: Hash },
    /// Parent not stored yet; recorded as detached.
    Detached { parent: Hash },
}

impl From<ParentLink> for Attachment {
    fn from(link: ParentLink) -> Self {
        match link {
            ParentLink::Genesis => Attachment::Genesis,
            ParentLink::Resolved(parent) => Attachment::Attached { parent },
            ParentLink::Detached(parent) => Attachment::Detached { parent },
        }
    }
}

/// Decide the parent link of an incoming header.
///
/// `parent_hash` is the wire parent (already cleared for the genesis
/// sentinel); `parent_stored` tells whether that parent exists in the store.
pub fn attachment_for(parent_hash: Option<Hash>, parent_stored: bool) -> Attachment {
    match parent_hash {
        None => Attachment::Genesis,
        Some(parent) if parent_stored => Attachment::Attached { parent },
        Some(parent) => Attachment::Detached { parent },
    }
}

/// Rewrite the parent columns of `header` to match `attachment`.
pub fn apply_attachment(header: &mut Header, attachment: Attachment) {
    match attachment {
        Attachment::Genesis => {
            header.parent_hash = None;
            header.detached_parent_hash = None;
        }
        Attachment::Attached { parent } => {
            header.parent_hash = Some(parent);
            header.detached_parent_hash = None;
        }
        Attachment::Detached { parent } => {
            header.parent_hash = None;
            header.detached_parent_hash = Some(parent);
        }
    }
}

/// Reattach a detached child to its newly stored parent.
///
/// Returns `false` if the child is not detached from `parent`.
pub fn reattach(child: &mut Header, parent: &Hash) -> bool {
    if child.parent_hash.is_none() && child.detached_parent_hash == Some(*parent) {
        child.detached_parent_hash = None;
        child.parent_hash = Some(*parent);
        true
    } else {
        false
    }
}

/// Last weight recorded for the canonical head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadWeight {
    pub hash: Hash,
    pub weight: U256,
}

/// Result of a reorganization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorgOutcome {
    /// The head is already canonical; nothing flipped.
    AlreadyCanonical { head: Hash },
    /// The head is not heavier than the current canonical head.
    Ignored {
        new_head: Hash,
        weight: U256,
        current_weight: U256,
    },
    /// The canonical chain switched branches.
    Reorganized {
        /// First canonical ancestor of the new head, if any.
        fork_point: Option<Hash>,
        /// Headers no longer canonical, ascending by block number.
        retracted: Vec<Hash>,
        /// Headers now canonical, ascending by block number.
        enacted: Vec<Hash>,
    },
}

impl ReorgOutcome {
    pub fn is_reorganized(&self) -> bool {
        matches!(self, ReorgOutcome::Reorganized { .. })
    }
}

/// The new branch of a reorganization, found by walking back from its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkBranch {
    /// First canonical ancestor of the head.
    pub fork_point: Option<Header>,
    /// Non-canonical headers from just above the fork point to the head,
    /// ascending by block number.
    pub branch: Vec<Header>,
}

impl ForkBranch {
    /// Block number above which the canonical chain is replaced.
    pub fn first_replaced_number(&self) -> u64 {
        match &self.fork_point {
            Some(fork) => fork.block_number + 1,
            None => self.branch.first().map(|h| h.block_number).unwrap_or(0),
        }
    }
}

/// Walk from `new_head` back along resolved parents to the first canonical
/// ancestor.
///
/// Fails if the walk meets a detached header, a missing parent, or more than
/// `max_depth` non-canonical headers.
pub fn find_fork_branch<S: HeaderSource>(
    source: &S,
    new_head: Header,
    max_depth: u64,
) -> Result<ForkBranch, IndexError> {
    let mut branch = Vec::new();
    let mut current = new_head;

    loop {
        if current.is_canonical {
            branch.reverse();
            return Ok(ForkBranch {
                fork_point: Some(current),
                branch,
            });
        }
        if branch.len() as u64 >= max_depth {
            return Err(IndexError::constraint(
                "header",
                format!("reorganization deeper than {max_depth} headers"),
            ));
        }

        let link = current.parent_link()?;
        let hash = current.hash;
        branch.push(current);

        current = match link {
            ParentLink::Resolved(parent) => source.find_header(&parent)?.ok_or_else(|| {
                IndexError::constraint(
                    "header",
                    format!(
                        "resolved parent {} of {} is missing",
                        short_hex(&parent),
                        short_hex(&hash)
                    ),
                )
            })?,
            ParentLink::Detached(parent) => {
                return Err(IndexError::constraint(
                    "header",
                    format!(
                        "new head is not connected to the canonical chain: {} waits for {}",
                        short_hex(&hash),
                        short_hex(&parent)
                    ),
                ));
            }
            ParentLink::Genesis => {
                branch.reverse();
                return Ok(ForkBranch {
                    fork_point: None,
                    branch,
                });
            }
        };
    }
}
