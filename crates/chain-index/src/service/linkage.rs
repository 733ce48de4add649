//! # Chain Linkage Implementation
//!
//! Header staging, reattachment of detached children, and reorganizations.
//! The canonical flag and the parent columns are only written from here.

use shared_types::{is_genesis_parent, short_hex, Hash, U256};
use tracing::{debug, info, warn};

use crate::domain::entities::{Header, ParentLink};
use crate::domain::errors::IndexError;
use crate::domain::keys::KeyPrefix;
use crate::domain::linkage::{
    apply_attachment, attachment_for, find_fork_branch, reattach, Attachment, HeadWeight,
    ReorgOutcome,
};
use crate::ports::inbound::ChainLinkageApi;
use crate::ports::outbound::{KeyValueRead, KeyValueStore};

use super::reader::{EntityReader, HEAD_WEIGHT};
use super::staging::StagedBatch;
use super::ChainIndexService;

/// Stage a header exactly as given, then reattach the children waiting for it.
pub(super) fn stage_header<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    header: Header,
) -> Result<Attachment, IndexError> {
    let link = header.parent_link()?;
    let hash = header.hash;
    let number = header.block_number;

    let reader = EntityReader::new(&*batch);
    if reader.header_exists(&hash)? {
        return Err(IndexError::constraint(
            "header",
            format!("{} already stored", short_hex(&hash)),
        ));
    }

    match link {
        ParentLink::Genesis => {
            if number != 0 {
                return Err(IndexError::constraint(
                    "header",
                    format!("{} at block {number} has no parent", short_hex(&hash)),
                ));
            }
            if !header.is_canonical {
                return Err(IndexError::constraint(
                    "header",
                    format!("genesis {} must be canonical", short_hex(&hash)),
                ));
            }
        }
        ParentLink::Resolved(parent) => {
            let Some(parent_header) = reader.header(&parent)? else {
                return Err(IndexError::constraint(
                    "header",
                    format!(
                        "parent {} of {} is not stored",
                        short_hex(&parent),
                        short_hex(&hash)
                    ),
                ));
            };
            if !follows(&parent_header, number) {
                return Err(IndexError::constraint(
                    "header",
                    format!(
                        "{} at block {number} cannot follow parent {} at block {}",
                        short_hex(&hash),
                        short_hex(&parent),
                        parent_header.block_number
                    ),
                ));
            }
        }
        ParentLink::Detached(parent) => {
            if reader.header_exists(&parent)? {
                return Err(IndexError::constraint(
                    "header",
                    format!(
                        "detached parent {} of {} is already stored",
                        short_hex(&parent),
                        short_hex(&hash)
                    ),
                ));
            }
        }
    }

    if header.is_canonical {
        if let Some(existing) = reader.canonical_hash_at(number)? {
            return Err(IndexError::constraint(
                "header",
                format!(
                    "block {number} already has canonical header {}",
                    short_hex(&existing)
                ),
            ));
        }
    }

    let attachment = Attachment::from(link);
    batch.put(KeyPrefix::header_by_number_key(number, &hash), Vec::new());
    if let Attachment::Detached { parent } = attachment {
        batch.put(KeyPrefix::pending_child_key(&parent, &hash), Vec::new());
    }
    if header.is_canonical {
        batch.put(KeyPrefix::canonical_key(number), hash.to_vec());
    }
    batch.put_value(KeyPrefix::header_key(&hash), &header)?;

    let reattached = stage_reattach(batch, &hash)?;
    debug!(
        "[chain-index] header {} #{} staged as {:?}, {} children reattached",
        short_hex(&hash),
        number,
        attachment,
        reattached.len()
    );
    Ok(attachment)
}

/// Whether a child at `number` directly follows `parent`.
fn follows(parent: &Header, number: u64) -> bool {
    parent.block_number.checked_add(1) == Some(number)
}

/// Stage a header after resolving its wire parent against the store.
pub(super) fn stage_attach<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    mut header: Header,
) -> Result<Attachment, IndexError> {
    header.parent_link()?;

    let wire_parent = header.wire_parent_hash();
    let parent = (!is_genesis_parent(&wire_parent)).then_some(wire_parent);
    let parent_stored = match &parent {
        Some(parent) => EntityReader::new(&*batch).header_exists(parent)?,
        None => false,
    };
    apply_attachment(&mut header, attachment_for(parent, parent_stored));
    stage_header(batch, header)
}

/// Resolve every header detached from `parent_hash`.
///
/// Children whose block number does not follow the parent's stay detached.
pub(super) fn stage_reattach<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    parent_hash: &Hash,
) -> Result<Vec<Hash>, IndexError> {
    let reader = EntityReader::new(&*batch);
    let parent = reader.require_header(parent_hash)?;
    let mut children = Vec::new();
    for child_hash in reader.pending_children(parent_hash)? {
        let child = reader.require_header(&child_hash)?;
        if follows(&parent, child.block_number) {
            children.push(child);
        } else {
            warn!(
                "[chain-index] {} at block {} left detached: parent {} is at block {}",
                short_hex(&child.hash),
                child.block_number,
                short_hex(parent_hash),
                parent.block_number
            );
        }
    }

    let mut reattached = Vec::with_capacity(children.len());
    for mut child in children {
        batch.delete(KeyPrefix::pending_child_key(parent_hash, &child.hash));
        if reattach(&mut child, parent_hash) {
            batch.put_value(KeyPrefix::header_key(&child.hash), &child)?;
            reattached.push(child.hash);
        }
    }
    Ok(reattached)
}

/// Weight of the current canonical chain.
///
/// Zero unless the recorded head is still canonical.
fn current_weight<R: KeyValueRead>(reader: &EntityReader<'_, R>) -> Result<U256, IndexError> {
    let Some(recorded) = reader.head_weight()? else {
        return Ok(U256::zero());
    };
    let still_canonical = reader
        .header(&recorded.hash)?
        .is_some_and(|header| header.is_canonical);
    Ok(if still_canonical {
        recorded.weight
    } else {
        U256::zero()
    })
}

pub(super) fn stage_reorganize<R: KeyValueRead>(
    batch: &mut StagedBatch<'_, R>,
    new_head: &Hash,
    weight: U256,
    max_depth: u64,
) -> Result<ReorgOutcome, IndexError> {
    let reader = EntityReader::new(&*batch);
    let head = reader.require_header(new_head)?;
    head.parent_link()?;
    let record = HeadWeight {
        hash: head.hash,
        weight,
    };

    if head.is_canonical {
        let is_tip = reader
            .canonical_head()?
            .is_some_and(|tip| tip.hash == head.hash);
        if is_tip && reader.head_weight()? != Some(record) {
            batch.put_value(KeyPrefix::metadata_key(HEAD_WEIGHT), &record)?;
        }
        return Ok(ReorgOutcome::AlreadyCanonical { head: head.hash });
    }

    let current = current_weight(&reader)?;
    if weight <= current {
        warn!(
            "[chain-index] reorg to {} ignored: weight {} does not beat {}",
            short_hex(new_head),
            weight,
            current
        );
        return Ok(ReorgOutcome::Ignored {
            new_head: *new_head,
            weight,
            current_weight: current,
        });
    }

    let fork = find_fork_branch(&reader, head, max_depth)?;
    let mut retired = Vec::new();
    for (number, hash) in reader.canonical_from(fork.first_replaced_number())? {
        retired.push((number, reader.require_header(&hash)?));
    }

    let mut retracted = Vec::with_capacity(retired.len());
    for (number, mut header) in retired {
        header.is_canonical = false;
        batch.delete(KeyPrefix::canonical_key(number));
        batch.put_value(KeyPrefix::header_key(&header.hash), &header)?;
        retracted.push(header.hash);
    }

    let mut enacted = Vec::with_capacity(fork.branch.len());
    for mut header in fork.branch {
        header.is_canonical = true;
        batch.put(
            KeyPrefix::canonical_key(header.block_number),
            header.hash.to_vec(),
        );
        batch.put_value(KeyPrefix::header_key(&header.hash), &header)?;
        enacted.push(header.hash);
    }
    batch.put_value(KeyPrefix::metadata_key(HEAD_WEIGHT), &record)?;

    Ok(ReorgOutcome::Reorganized {
        fork_point: fork.fork_point.map(|header| header.hash),
        retracted,
        enacted,
    })
}

impl<KV: KeyValueStore> ChainLinkageApi for ChainIndexService<KV> {
    fn attach(&mut self, header: Header) -> Result<Attachment, IndexError> {
        let hash = header.hash;
        let attachment = self.write_with(|batch, _| stage_attach(batch, header))?;
        debug!(
            "[chain-index] attached {} as {:?}",
            short_hex(&hash),
            attachment
        );
        Ok(attachment)
    }

    fn resolve_pending(&mut self, parent_hash: &Hash) -> Result<Vec<Hash>, IndexError> {
        self.reader().require_header(parent_hash)?;
        let reattached = self.write_with(|batch, _| stage_reattach(batch, parent_hash))?;
        if !reattached.is_empty() {
            info!(
                "[chain-index] reattached {} headers under {}",
                reattached.len(),
                short_hex(parent_hash)
            );
        }
        Ok(reattached)
    }

    fn reorganize(&mut self, new_head: &Hash, weight: U256) -> Result<ReorgOutcome, IndexError> {
        let outcome = self.write_with(|batch, config| {
            stage_reorganize(batch, new_head, weight, config.max_reorg_depth)
        })?;
        if let ReorgOutcome::Reorganized {
            fork_point,
            retracted,
            enacted,
        } = &outcome
        {
            info!(
                "[chain-index] reorg to {} (weight {}): fork at {}, {} retracted, {} enacted",
                short_hex(new_head),
                weight,
                fork_point
                    .map(|hash| short_hex(&hash))
                    .unwrap_or_else(|| "none".to_string()),
                retracted.len(),
                enacted.len()
            );
        }
        Ok(outcome)
    }

    fn canonical_head(&self) -> Result<Option<Header>, IndexError> {
        self.reader().canonical_head()
    }

    fn canonical_hash_at(&self, number: u64) -> Result<Option<Hash>, IndexError> {
        self.reader().canonical_hash_at(number)
    }

    fn canonical_header_at(&self, number: u64) -> Result<Header, IndexError> {
        let reader = self.reader();
        let hash = reader
            .canonical_hash_at(number)?
            .ok_or_else(|| IndexError::not_found("canonical header", format!("#{number}")))?;
        reader.require_header(&hash)
    }

    fn head_weight(&self) -> Result<Option<HeadWeight>, IndexError> {
        self.reader().head_weight()
    }

    fn pending_children(&self, parent_hash: &Hash) -> Result<Vec<Hash>, IndexError> {
        self.reader().pending_children(parent_hash)
    }
}
