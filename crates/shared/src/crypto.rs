//! Hashing helpers for document fingerprints.

use sha2::{Digest, Sha256};

/// Number of hex characters shown when a fingerprint is logged.
pub const SHORT_FINGERPRINT_LEN: usize = 12;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Shortens a hex fingerprint for log output.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint
        .get(..SHORT_FINGERPRINT_LEN)
        .unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_different_inputs() {
        assert_ne!(sha256_hex(r#"{"a":1}"#), sha256_hex(r#"{"a":2}"#));
    }

    #[test]
    fn test_short_fingerprint() {
        let hash = sha256_hex("test");
        assert_eq!(short_fingerprint(&hash), "9f86d081884c");
        assert_eq!(short_fingerprint("abc"), "abc");
    }
}
