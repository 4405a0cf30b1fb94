//! Random credential material and digest helpers.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of logged credential fingerprints.
const FINGERPRINT_LEN: usize = 12;

/// `n` random bytes encoded as unpadded url-safe base64.
pub fn token_urlsafe(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `n` random bytes encoded as lowercase hex.
pub fn token_hex(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a string.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Short fingerprint of a secret, safe to log: a truncated SHA-256 digest,
/// never the secret itself.
pub fn fingerprint(secret: &str) -> String {
    let digest = sha256_hex(secret);
    digest[..FINGERPRINT_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(token_urlsafe(32), token_urlsafe(32));
        assert_ne!(token_hex(8), token_hex(8));
        assert_eq!(token_hex(8).len(), 16);
    }

    #[test]
    fn test_fingerprint_is_not_the_secret() {
        let secret = "super-secret-token";
        let fp = fingerprint(secret);
        assert_eq!(fp.len(), 12);
        assert!(!secret.contains(&fp));
        assert_eq!(fp, fingerprint(secret));
    }
}
