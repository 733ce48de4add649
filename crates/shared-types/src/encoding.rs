//! # Display Encoding
//!
//! Hex helpers used when hashes show up in log lines and error messages.

/// Number of leading bytes shown by [`short_hex`].
pub const SHORT_HEX_BYTES: usize = 4;

/// Full `0x`-prefixed hex encoding.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Abbreviated hex encoding: `0x` + the first four bytes + `..`.
///
/// Inputs no longer than four bytes are encoded in full.
pub fn short_hex(bytes: &[u8]) -> String {
    if bytes.len() <= SHORT_HEX_BYTES {
        return to_hex(bytes);
    }
    format!("0x{}..", hex::encode(&bytes[..SHORT_HEX_BYTES]))
}
