//! # Key Derivation Functions
//!
//! This module provides key derivation for generating cryptographic keys
//! from seeds, shared secrets, and the user's mailbox secret.
//!
//! ## Derivation Paths
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION PATHS                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Seed → key pair (deterministic provisioning and tests)                │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  HKDF-SHA256(                                                │       │
//! │  │    ikm = seed,                                              │       │
//! │  │    info = "mailvault-signing-key-v1"                        │       │
//! │  │          | "mailvault-encryption-key-v1"                    │       │
//! │  │  ) → Ed25519 seed / X25519 secret                          │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Mailbox secret → wrap key (keys at rest)                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Argon2id(                                                   │       │
//! │  │    password = mailbox secret,                               │       │
//! │  │    salt = random 16 bytes stored in the envelope,           │       │
//! │  │    m = 64 MiB, t = 3, p = 4                                 │       │
//! │  │  ) → 32-byte AES-256-GCM key                               │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  An HKDF over the raw secret would be fast to brute-force; a memory-   │
//! │  hard password hash is required because mailbox secrets are            │
//! │  human-chosen.                                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

use crate::crypto::encryption::EncryptionKey;
use crate::error::{Error, Result};

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even when derived from the same seed.
pub mod domain {
    /// Domain for signing key derivation
    pub const SIGNING_KEY: &[u8] = b"mailvault-signing-key-v1";

    /// Domain for encryption key derivation
    pub const ENCRYPTION_KEY: &[u8] = b"mailvault-encryption-key-v1";
}

// Argon2id parameters (hardened for key derivation)
// Memory: 64 MiB, Iterations: 3, Parallelism: 4
const ARGON2_M_COST: u32 = 64 * 1024; // 64 MiB in KiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Size of the random salt stored next to a mailbox-wrapped key
pub const MAILBOX_SALT_SIZE: usize = 16;

/// Keys derived from a seed
#[derive(ZeroizeOnDrop)]
pub struct DerivedKeys {
    /// Ed25519 signing key (32 bytes)
    #[zeroize(skip)]
    pub signing_key: [u8; 32],

    /// X25519 encryption key (32 bytes)
    #[zeroize(skip)]
    pub encryption_key: [u8; 32],
}

/// Derive signing and encryption keys from a seed
///
/// ## Process
///
/// ```text
/// Seed (32 bytes)
///       │
///       ├──► HKDF(info="mailvault-signing-key-v1")    → Signing Key
///       │
///       └──► HKDF(info="mailvault-encryption-key-v1") → Encryption Key
/// ```
///
/// ## Security Note
///
/// The input seed should have at least 256 bits of entropy.
pub fn derive_keys_from_seed(seed: &[u8; 32]) -> Result<DerivedKeys> {
    let hkdf = Hkdf::<Sha256>::new(None, seed);

    let mut signing_key = [0u8; 32];
    hkdf.expand(domain::SIGNING_KEY, &mut signing_key)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive signing key".into()))?;

    let mut encryption_key = [0u8; 32];
    hkdf.expand(domain::ENCRYPTION_KEY, &mut encryption_key)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive encryption key".into()))?;

    Ok(DerivedKeys {
        signing_key,
        encryption_key,
    })
}

/// Derive an AES-256-GCM wrap key from the user's mailbox secret
///
/// Uses Argon2id with hardened parameters so offline guessing of a stolen
/// key envelope stays expensive. The salt must be random per wrap and is
/// stored alongside the ciphertext.
pub fn derive_mailbox_key(secret: &[u8], salt: &[u8]) -> Result<EncryptionKey> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| Error::KeyDerivationFailed(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; ARGON2_OUTPUT_LEN];
    argon2
        .hash_password_into(secret, salt, &mut key)
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2 derivation failed: {}", e)))?;

    Ok(EncryptionKey::from_bytes(key))
}

/// Compute the fingerprint of a key's public halves
///
/// SHA-256 over `signing_public || encryption_public`, hex encoded. The
/// fingerprint identifies a key in signed key lists and key info records.
pub fn key_fingerprint(signing_public: &[u8; 32], encryption_public: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signing_public);
    hasher.update(encryption_public);
    hex::encode(hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_keys_deterministic() {
        let seed = [42u8; 32];

        let keys1 = derive_keys_from_seed(&seed).unwrap();
        let keys2 = derive_keys_from_seed(&seed).unwrap();

        assert_eq!(keys1.signing_key, keys2.signing_key);
        assert_eq!(keys1.encryption_key, keys2.encryption_key);
    }

    #[test]
    fn test_derive_keys_different_seeds() {
        let keys1 = derive_keys_from_seed(&[1u8; 32]).unwrap();
        let keys2 = derive_keys_from_seed(&[2u8; 32]).unwrap();

        assert_ne!(keys1.signing_key, keys2.signing_key);
        assert_ne!(keys1.encryption_key, keys2.encryption_key);
    }

    #[test]
    fn test_signing_encryption_keys_different() {
        let keys = derive_keys_from_seed(&[42u8; 32]).unwrap();

        // Signing and encryption keys should be different
        assert_ne!(keys.signing_key, keys.encryption_key);
    }

    #[test]
    fn test_mailbox_key_deterministic_per_salt() {
        let secret = b"hunter2";
        let salt = [9u8; MAILBOX_SALT_SIZE];

        let key1 = derive_mailbox_key(secret, &salt).unwrap();
        let key2 = derive_mailbox_key(secret, &salt).unwrap();

        let (nonce, ct) = crate::crypto::encryption::encrypt(&key1, b"data", b"").unwrap();
        let pt = crate::crypto::encryption::decrypt(&key2, &nonce, &ct, b"").unwrap();
        assert_eq!(pt, b"data");
    }

    #[test]
    fn test_mailbox_key_salt_separation() {
        let secret = b"hunter2";

        let key1 = derive_mailbox_key(secret, &[1u8; MAILBOX_SALT_SIZE]).unwrap();
        let key2 = derive_mailbox_key(secret, &[2u8; MAILBOX_SALT_SIZE]).unwrap();

        let (nonce, ct) = crate::crypto::encryption::encrypt(&key1, b"data", b"").unwrap();
        assert!(crate::crypto::encryption::decrypt(&key2, &nonce, &ct, b"").is_err());
    }

    #[test]
    fn test_fingerprint_stable_and_distinct() {
        let fp1 = key_fingerprint(&[1u8; 32], &[2u8; 32]);
        let fp2 = key_fingerprint(&[1u8; 32], &[2u8; 32]);
        let fp3 = key_fingerprint(&[3u8; 32], &[2u8; 32]);

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
        assert_eq!(fp1.len(), 64); // SHA-256 hex
    }
}
