use sha2::{Digest, Sha256};

/// Constant time comparison over equal-length inputs
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.iter().zip(b.iter()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// Compares a presented shared secret with the configured one without leaking
/// the configured length. An empty configured secret never matches.
pub fn verify_shared_secret(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let presented_digest = Sha256::digest(presented.as_bytes());
    let expected_digest = Sha256::digest(expected.as_bytes());
    secure_compare(presented_digest.as_slice(), expected_digest.as_slice())
}
