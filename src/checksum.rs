//! SHA-256 checksums rendered as lowercase hex
//!
//! Verification is a normal outcome, not a fault: a malformed expected digest
//! simply fails to match. The comparison runs over the decoded digest bytes
//! in constant time via `subtle::ConstantTimeEq`.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a SHA-256 digest rendered as hex.
pub const SHA256_HEX_LEN: usize = 64;

/// Compute SHA-256 over `data` and return 64 lowercase hex characters.
pub fn compute_sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Recompute the digest of `data` and compare it with `expected_hex`.
///
/// The comparison is case-insensitive. Odd-length, non-hex or wrongly sized
/// input returns `false`.
pub fn verify(data: &[u8], expected_hex: &str) -> bool {
    if expected_hex.len() != SHA256_HEX_LEN {
        return false;
    }
    // hex::decode accepts both cases
    let expected = match hex::decode(expected_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let actual = Sha256::digest(data);
    actual.as_slice().ct_eq(&expected).into()
}
