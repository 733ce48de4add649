//! # Domain Errors
//!
//! Error types for the chain index.
//!
//! ## Taxonomy
//!
//! - `ConstraintViolation` - uniqueness, foreign-key, parent-linkage or range
//!   checks on an insert. Never partially applied.
//! - `DuplicateIndex` / `RangeError` - ordering violations on an association.
//! - `NotFound` - lookup against an absent key. Recoverable.
//! - `Database` / `Serialization` - failures of the storage port or codec.

use crate::domain::ordering::AssociationKind;
use thiserror::Error;

/// Errors surfaced by every chain index operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A structural or referential invariant would be broken.
    #[error("Constraint violation on {entity}: {reason}")]
    ConstraintViolation {
        entity: &'static str,
        reason: String,
    },

    /// The ordering index is already taken under this parent.
    #[error("Duplicate {association} index {index} under parent {parent}")]
    DuplicateIndex {
        association: AssociationKind,
        parent: String,
        index: u32,
    },

    /// The ordering index is negative or above the association's bound.
    #[error("{association} index {index} out of range [0, {max}]")]
    RangeError {
        association: AssociationKind,
        index: i64,
        max: u32,
    },

    /// No entity exists under this key.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Key-value store failure.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Value encoding or decoding failure.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl IndexError {
    pub(crate) fn constraint(entity: &'static str, reason: impl Into<String>) -> Self {
        IndexError::ConstraintViolation {
            entity,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        IndexError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Returns `true` for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

impl From<KVStoreError> for IndexError {
    fn from(err: KVStoreError) -> Self {
        IndexError::Database {
            message: err.to_string(),
        }
    }
}

/// Value codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Codec error: {message}")]
pub struct CodecError {
    pub message: String,
}

impl From<CodecError> for IndexError {
    fn from(err: CodecError) -> Self {
        IndexError::Serialization {
            message: err.message,
        }
    }
}
