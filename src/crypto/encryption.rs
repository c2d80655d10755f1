//! # Encryption Module
//!
//! Provides AES-256-GCM authenticated encryption for key packages.
//!
//! ## Wrapping Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       KEY PACKAGE ENCRYPTION                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Obtain a wrap key                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Either:                                                     │       │
//! │  │  • X25519 DH against the primary key, then HKDF             │       │
//! │  │    (member keys pending activation)                         │       │
//! │  │  • Argon2id over the mailbox secret                         │       │
//! │  │    (keys at rest after activation)                          │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 2: Generate Nonce (unique per wrap)                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Random 12 bytes from CSPRNG                                 │       │
//! │  │  (Never reuse a nonce with the same key!)                   │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 3: Encrypt                                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM(                                                │       │
//! │  │    key = wrap_key,                                          │       │
//! │  │    nonce = random_nonce,                                    │       │
//! │  │    plaintext = secret key material,                         │       │
//! │  │    aad = key id                                             │       │
//! │  │  )                                                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Ciphertext + 16-byte Auth Tag                              │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Binding the key id as AAD means a ciphertext cannot be replayed       │
//! │  as the package of a different key.                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// ## Critical Security Requirement
///
/// **NEVER reuse a nonce with the same key!**
///
/// Nonce reuse completely breaks AES-GCM security. We use random nonces,
/// which are safe for up to 2^32 messages per key (birthday bound for
/// 96-bit nonces) — far above the handful of wraps any single key sees.
#[derive(Clone, Copy, Debug)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A shared secret derived from X25519 key exchange
///
/// This is used to derive key-wrapping keys via HKDF.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    #[zeroize(skip)]
    bytes: [u8; 32],
}

impl SharedSecret {
    /// Create from raw DH output
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Derive a wrap key from this shared secret
    ///
    /// Uses HKDF-SHA256 with the key id as salt, so every key package gets
    /// an independent wrap key even when the same two parties are involved.
    pub fn derive_key(&self, key_id: &[u8]) -> Result<EncryptionKey> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hkdf = Hkdf::<Sha256>::new(Some(key_id), &self.bytes);
        let mut key = [0u8; KEY_SIZE];
        hkdf.expand(b"mailvault-key-wrap-v1", &mut key)
            .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

        Ok(EncryptionKey(key))
    }
}

/// An AES-256-GCM encryption key
///
/// Zeroized when dropped for security.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Encrypt data using AES-256-GCM
///
/// ## Parameters
///
/// - `key`: 256-bit encryption key
/// - `plaintext`: Data to encrypt
/// - `aad`: Additional authenticated data (not encrypted, but authenticated)
///
/// ## Returns
///
/// Tuple of (nonce, ciphertext_with_tag)
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random()?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt data using AES-256-GCM
///
/// ## Parameters
///
/// - `key`: 256-bit encryption key (must be same as used for encryption)
/// - `nonce`: Nonce used during encryption
/// - `ciphertext`: Ciphertext with authentication tag
/// - `aad`: Additional authenticated data (must match encryption)
///
/// ## Errors
///
/// Returns `DecryptionFailed` if:
/// - The ciphertext was tampered with
/// - The AAD doesn't match
/// - The key is wrong
/// - The nonce is wrong
pub fn decrypt(
    key: &EncryptionKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| {
            Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
        })
}

// ============================================================================
// TESTS
// ============================================================================
