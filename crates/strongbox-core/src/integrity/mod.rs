use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hex-encoded SHA-256 of the plaintext.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Recompute the checksum of `data` and compare it to `expected` in
/// constant time. Case-insensitive on the expected hex.
pub fn verify_checksum(data: &[u8], expected: &str) -> bool {
    let computed = compute_checksum(data);
    let expected = expected.trim().to_ascii_lowercase();
    if computed.len() != expected.len() {
        return false;
    }
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}
