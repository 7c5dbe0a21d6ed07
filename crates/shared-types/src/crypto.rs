//! # Crypto Primitives
//!
//! Ed25519 node keys and SHA3-256 content hashing.
//!
//! Keys, signatures and digests travel as lowercase hex strings so they can be
//! stored verbatim inside JSON documents.

use crate::errors::EntityError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::Serialize;
use sha3::{Digest, Sha3_256};

/// SHA3-256 digest of `data`, hex encoded.
pub fn sha3_256_hex(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Canonical JSON encoding used for hashing and signing.
///
/// Struct fields serialize in declaration order and `serde_json` maps are
/// key-sorted, so equal values always yield equal bytes.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EntityError> {
    Ok(serde_json::to_vec(value)?)
}

/// An Ed25519 keypair identifying a federation node or an asset owner.
#[derive(Clone)]
pub struct NodeKeypair {
    signing: SigningKey,
    public_hex: String,
}

impl NodeKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let secret: [u8; 32] = rand::random();
        Self::from_secret_bytes(&secret)
    }

    /// Restore a keypair from its hex-encoded 32-byte secret.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, EntityError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| EntityError::InvalidKey(format!("secret key: {e}")))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EntityError::InvalidKey("secret key must be 32 bytes".into()))?;
        Ok(Self::from_secret_bytes(&secret))
    }

    fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(secret);
        let public_hex = hex::encode(signing.verifying_key().to_bytes());
        Self {
            signing,
            public_hex,
        }
    }

    /// Hex-encoded public key.
    pub fn public_key(&self) -> &str {
        &self.public_hex
    }

    /// Hex-encoded secret key.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    /// Sign `message`, returning the hex-encoded 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeypair")
            .field("public_key", &self.public_hex)
            .finish_non_exhaustive()
    }
}

/// Verify a hex signature over `message` against a hex public key.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let Some(key) = decode_array::<32>(public_key_hex) else {
        return false;
    };
    let Some(sig) = decode_array::<64>(signature_hex) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&key) else {
        return false;
    };
    verifying
        .verify(message, &Signature::from_bytes(&sig))
        .is_ok()
}

fn decode_array<const N: usize>(value: &str) -> Option<[u8; N]> {
    hex::decode(value).ok()?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keys = NodeKeypair::generate();
        let sig = keys.sign(b"vote body");

        assert!(verify_signature(keys.public_key(), b"vote body", &sig));
        assert!(!verify_signature(keys.public_key(), b"other body", &sig));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let keys = NodeKeypair::generate();
        assert!(!verify_signature("zz", b"msg", &keys.sign(b"msg")));
        assert!(!verify_signature(keys.public_key(), b"msg", "abcd"));
    }

    #[test]
    fn test_secret_hex_restores_same_key() {
        let keys = NodeKeypair::generate();
        let restored = NodeKeypair::from_secret_hex(&keys.secret_hex()).unwrap();
        assert_eq!(keys.public_key(), restored.public_key());
    }

    #[test]
    fn test_secret_hex_wrong_length() {
        let err = NodeKeypair::from_secret_hex("abcd").unwrap_err();
        assert!(matches!(err, EntityError::InvalidKey(_)));
    }

    #[test]
    fn test_sha3_is_stable() {
        assert_eq!(sha3_256_hex(b"abc"), sha3_256_hex(b"abc"));
        assert_eq!(sha3_256_hex(b"abc").len(), 64);
    }
}
