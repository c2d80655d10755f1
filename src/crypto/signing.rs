//! # Digital Signatures Module
//!
//! Provides Ed25519 digital signatures for key list manifests.
//!
//! A signed key list asserts which keys are currently valid for an address;
//! the signature is made with the address key itself, so anyone holding the
//! published public key can check that the manifest was produced by the key
//! owner and has not been altered.
//!
//! ## Security Properties
//!
//! | Property | Description |
//! |----------|-------------|
//! | Authenticity | Verifies the manifest came from the key owner |
//! | Integrity | Detects any modification to the signed manifest |
//! | Non-repudiation | Signer cannot deny having published the manifest |
//! | Public Verification | Anyone with the public key can verify |

use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::crypto::SigningKeyPair;
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 digital signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_bytes")] pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 64 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidKey(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                slice.len()
            )));
        }
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Encode as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::InvalidKey(format!("Invalid signature hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign a message using Ed25519
///
/// ## Security Note
///
/// Ed25519 signatures are deterministic: signing the same message with the
/// same key always produces the same signature. This is intentional and
/// provides better security properties than randomized signatures.
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Signature {
    let sig = keypair.signing_key().sign(message);
    Signature(sig.to_bytes())
}

/// Verify an Ed25519 signature
///
/// ## Parameters
///
/// - `public_key`: The signer's public key (32 bytes)
/// - `message`: The signed message
/// - `signature`: The signature to verify
///
/// ## Errors
///
/// Returns `VerificationFailed` if the signature does not match, or
/// `InvalidKey` if the public key cannot be parsed.
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &Signature) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| Error::InvalidKey(format!("Invalid public key: {}", e)))?;

    let sig = Ed25519Signature::from_bytes(&signature.0);

    verifying_key
        .verify(message, &sig)
        .map_err(|_| Error::VerificationFailed)
}

/// Serde helper for serializing signatures as hex
mod signature_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SIGNATURE_SIZE;

    pub fn serialize<S>(bytes: &[u8; SIGNATURE_SIZE], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; SIGNATURE_SIZE], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|_| serde::de::Error::custom("Invalid length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let keypair = SigningKeyPair::generate();
        let message = b"key list manifest";

        let signature = sign(&keypair, message);

        assert!(verify(&keypair.public_bytes(), message, &signature).is_ok());
    }

    #[test]
    fn test_tampered_message_fails() {
        let keypair = SigningKeyPair::generate();

        let signature = sign(&keypair, b"key list manifest");

        let result = verify(&keypair.public_bytes(), b"key list manifesto", &signature);
        assert!(matches!(result, Err(Error::VerificationFailed)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = SigningKeyPair::generate();
        let other = SigningKeyPair::generate();
        let message = b"key list manifest";

        let signature = sign(&signer, message);

        let result = verify(&other.public_bytes(), message, &signature);
        assert!(matches!(result, Err(Error::VerificationFailed)));
    }

    #[test]
    fn test_signature_hex_round_trip() {
        let keypair = SigningKeyPair::generate();
        let signature = sign(&keypair, b"data");

        let restored = Signature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(signature, restored);
    }

    #[test]
    fn test_signature_from_short_slice_rejected() {
        assert!(Signature::from_slice(&[0u8; 63]).is_err());
    }
}
