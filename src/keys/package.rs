//! # Key Package Formats
//!
//! Wire formats of wrapped private key material.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       KEY PACKAGE FORMATS                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  LockedKeyPackage — member key awaiting activation                     │
//! │  ───────────────────────────────────────────────────                    │
//! │  {                                                                      │
//! │    "version": 1,                                                        │
//! │    "ephemeral_public": "hex...",   // X25519 ephemeral public key       │
//! │    "nonce": "base64...",           // 12-byte AES-GCM nonce             │
//! │    "ciphertext": "base64..."       // secret halves + auth tag          │
//! │  }                                                                      │
//! │  Wrap key: X25519(ephemeral, primary_public) → HKDF(key id)            │
//! │                                                                         │
//! │  EncryptedPrivateKey — activated key at rest                           │
//! │  ─────────────────────────────────────────────                          │
//! │  {                                                                      │
//! │    "version": 1,                                                        │
//! │    "salt": "base64...",            // 16-byte Argon2id salt             │
//! │    "nonce": "base64...",           // 12-byte AES-GCM nonce             │
//! │    "ciphertext": "base64..."       // secret halves + auth tag          │
//! │  }                                                                      │
//! │  Wrap key: Argon2id(mailbox secret, salt)                              │
//! │                                                                         │
//! │  Both formats bind the owning key id as AEAD associated data, so a     │
//! │  package cannot be replayed as the material of a different key.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, KeyPair, Nonce, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::keys::KeyId;

/// Current key package format version
pub const KEY_PACKAGE_VERSION: u8 = 1;

/// A member key wrapped under the account's primary key
///
/// Produced when a dependent address key is provisioned; consumed by the
/// activation pipeline, which unwraps it with the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedKeyPackage {
    /// Format version
    pub version: u8,
    /// Ephemeral X25519 public key used for the wrap (hex encoded)
    pub ephemeral_public: String,
    /// AES-GCM nonce (base64 encoded)
    pub nonce: String,
    /// Encrypted secret key material with auth tag (base64 encoded)
    pub ciphertext: String,
}

impl LockedKeyPackage {
    /// Decode the ephemeral public key
    pub fn ephemeral_public_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.ephemeral_public)
            .map_err(|e| Error::DeserializationError(format!("Invalid ephemeral key: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| Error::DeserializationError("Invalid ephemeral key length".into()))
    }

    /// Decode the nonce
    pub fn nonce(&self) -> Result<Nonce> {
        decode_nonce(&self.nonce)
    }

    /// Decode the ciphertext
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.ciphertext)
            .map_err(|e| Error::DeserializationError(format!("Invalid ciphertext: {}", e)))
    }
}

/// An activated key wrapped under the user's mailbox secret
///
/// This is the at-rest form submitted to the remote key service and stored
/// in account data; it is opened again at account load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedPrivateKey {
    /// Format version
    pub version: u8,
    /// Argon2id salt (base64 encoded)
    pub salt: String,
    /// AES-GCM nonce (base64 encoded)
    pub nonce: String,
    /// Encrypted secret key material with auth tag (base64 encoded)
    pub ciphertext: String,
}

impl EncryptedPrivateKey {
    /// Wrap a key pair under the mailbox secret
    ///
    /// Uses a fresh random salt and nonce for every wrap; the owning key id
    /// is bound as associated data.
    pub fn seal(pair: &KeyPair, key_id: &KeyId, mailbox_secret: &[u8]) -> Result<Self> {
        let mut salt = [0u8; crypto::MAILBOX_SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let wrap_key = crypto::derive_mailbox_key(mailbox_secret, &salt)?;
        let secret = pair.secret_bytes();
        let (nonce, ciphertext) = crypto::encrypt(&wrap_key, secret.as_ref(), key_id.as_aad())?;

        Ok(Self {
            version: KEY_PACKAGE_VERSION,
            salt: BASE64.encode(salt),
            nonce: BASE64.encode(nonce.as_bytes()),
            ciphertext: BASE64.encode(&ciphertext),
        })
    }

    /// Open the package back into a usable key pair
    ///
    /// Fails with `DecryptionFailed` on a wrong secret, a wrong key id, or a
    /// tampered package.
    pub fn open(&self, key_id: &KeyId, mailbox_secret: &[u8]) -> Result<KeyPair> {
        if self.version != KEY_PACKAGE_VERSION {
            return Err(Error::DeserializationError(format!(
                "Unsupported key package version: {} (expected {})",
                self.version, KEY_PACKAGE_VERSION
            )));
        }

        let salt = BASE64
            .decode(&self.salt)
            .map_err(|e| Error::DeserializationError(format!("Invalid salt: {}", e)))?;
        let nonce = decode_nonce(&self.nonce)?;
        let ciphertext = BASE64
            .decode(&self.ciphertext)
            .map_err(|e| Error::DeserializationError(format!("Invalid ciphertext: {}", e)))?;

        let wrap_key = crypto::derive_mailbox_key(mailbox_secret, &salt)?;
        let secret = crypto::decrypt(&wrap_key, &nonce, &ciphertext, key_id.as_aad())?;

        KeyPair::from_secret_bytes(&secret)
    }
}

/// Decode a base64 nonce field
fn decode_nonce(encoded: &str) -> Result<Nonce> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| Error::DeserializationError(format!("Invalid nonce: {}", e)))?;
    let array: [u8; NONCE_SIZE] = bytes
        .try_into()
        .map_err(|_| Error::DeserializationError("Invalid nonce length".into()))?;
    Ok(Nonce::from_bytes(array))
}

// ============================================================================
// TESTS
// ============================================================================
