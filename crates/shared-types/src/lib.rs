//! # Shared Types Crate
//!
//! Primitive value types used across the workspace.
//!
//! ## Design Principles
//!
//! - **Fixed-width identifiers**: hashes and addresses are plain byte arrays so
//!   they can be embedded directly in storage keys.
//! - **No domain logic**: entities and their invariants live in the crates
//!   that own them.

pub mod encoding;
pub mod entities;

pub use encoding::*;
pub use entities::*;
