//! # Primitive Entities
//!
//! Identifiers and numeric types shared by the chain index.

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 32-byte hash (block, transaction, topic, state root).
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// An 8-byte header seal nonce.
pub type HeaderNonce = [u8; 8];

/// Length of a bloom filter in bytes (1024 bits).
pub const BLOOM_BYTES: usize = 128;

/// A bloom filter, as carried by headers and receipts.
pub type Bloom = [u8; BLOOM_BYTES];

/// The empty bloom filter.
pub const EMPTY_BLOOM: Bloom = [0u8; BLOOM_BYTES];

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Parent hash carried on the wire by a genesis header.
///
/// A header whose parent hash equals this sentinel has no parent.
pub const GENESIS_PARENT_HASH: Hash = ZERO_HASH;

/// Returns `true` if `parent_hash` is the genesis sentinel.
#[inline]
pub fn is_genesis_parent(parent_hash: &Hash) -> bool {
    *parent_hash == GENESIS_PARENT_HASH
}
