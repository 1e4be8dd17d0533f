//! Credential verification
//!
//! The engine never sees stored secrets in the clear: it hands the presented
//! PIN and the stored digest to a [`CredentialVerifier`] and acts on the
//! boolean. `Sha256Verifier` is the default implementation; swap in a real
//! KDF-backed verifier at the seam without touching the engine.

use sha2::{Digest, Sha256};

/// Verifies a presented PIN against a stored digest.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, pin: &str, stored_hash: &str) -> bool;
}

/// SHA-256 hex digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Verifier;

/// Digest a PIN for storage.
pub fn hash_pin(pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

impl CredentialVerifier for Sha256Verifier {
    fn verify(&self, pin: &str, stored_hash: &str) -> bool {
        hash_pin(pin) == stored_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_round_trip() {
        let hash = hash_pin("123456");
        assert!(Sha256Verifier.verify("123456", &hash));
        assert!(!Sha256Verifier.verify("654321", &hash));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = hash_pin("123456");
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
        // Known vector for "123456"
        assert_eq!(
            hash,
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }
}
