//! # Key Material
//!
//! This module defines the cryptographic key pairs that make up a mail key.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SigningKeyPair (Ed25519)                                       │   │
//! │  │  ─────────────────────────                                       │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • Signing key list manifests for an address                    │   │
//! │  │  • Verifying manifests published by other clients               │   │
//! │  │                                                                  │   │
//! │  │  Format:                                                        │   │
//! │  │  • Private key: 32 bytes (kept secret, zeroized on drop)       │   │
//! │  │  • Public key: 32 bytes (shared freely)                        │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  EncryptionKeyPair (X25519)                                     │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                  │   │
//! │  │  Purpose:                                                       │   │
//! │  │  • Unwrapping member keys addressed to this key (ECDH)          │   │
//! │  │  • Encrypting mail bodies to this address                       │   │
//! │  │                                                                  │   │
//! │  │  Format:                                                        │   │
//! │  │  • Private key: 32 bytes (kept secret, zeroized on drop)       │   │
//! │  │  • Public key: 32 bytes (published in the key list)            │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyPair (Combined)                                             │   │
//! │  │  ────────────────────                                            │   │
//! │  │                                                                  │   │
//! │  │  Contains both signing and encryption keypairs.                 │   │
//! │  │  One KeyPair is the decrypted form of one account or address    │   │
//! │  │  key package.                                                   │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Combined size of the serialized secret halves (signing + encryption)
pub const SECRET_BYTES_SIZE: usize = 64;

/// Combined keypair containing both signing and encryption keys
///
/// ## Security
///
/// - Private keys are zeroized when this struct is dropped
/// - The decrypted form of a key package only exists in memory
/// - Public keys can be safely shared with anyone
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    /// Ed25519 keypair for signing
    pub signing: SigningKeyPair,
    /// X25519 keypair for encryption
    pub encryption: EncryptionKeyPair,
}

impl KeyPair {
    /// Generate a new random keypair
    ///
    /// Uses the operating system's secure random number generator.
    pub fn generate() -> Self {
        Self {
            signing: SigningKeyPair::generate(),
            encryption: EncryptionKeyPair::generate(),
        }
    }

    /// Create a keypair from a 32-byte seed
    ///
    /// This is deterministic: the same seed always produces the same keys.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        use crate::crypto::kdf::derive_keys_from_seed;

        let derived = derive_keys_from_seed(seed)?;

        Ok(Self {
            signing: SigningKeyPair::from_bytes(&derived.signing_key)?,
            encryption: EncryptionKeyPair::from_bytes(&derived.encryption_key),
        })
    }

    /// Get the public keys for sharing with others
    pub fn public_keys(&self) -> PublicKey {
        PublicKey {
            signing: self.signing.public_bytes(),
            encryption: self.encryption.public_bytes(),
        }
    }

    /// Serialize the secret halves for wrapping inside a key package
    ///
    /// Layout is `signing_secret (32) || encryption_secret (32)`.
    ///
    /// ## Security Warning
    ///
    /// The returned buffer is zeroized on drop, but callers must only feed
    /// it into an encryption step — never log, store, or transmit it as-is.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SECRET_BYTES_SIZE]> {
        let mut combined = Zeroizing::new([0u8; SECRET_BYTES_SIZE]);
        combined[..32].copy_from_slice(&self.signing.secret_bytes());
        combined[32..].copy_from_slice(&self.encryption.secret_bytes());
        combined
    }

    /// Reconstruct a keypair from serialized secret halves
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_BYTES_SIZE {
            return Err(Error::InvalidKey(format!(
                "Key material must be {} bytes, got {}",
                SECRET_BYTES_SIZE,
                bytes.len()
            )));
        }

        let mut signing = [0u8; 32];
        let mut encryption = [0u8; 32];
        signing.copy_from_slice(&bytes[..32]);
        encryption.copy_from_slice(&bytes[32..]);

        let pair = Self {
            signing: SigningKeyPair::from_bytes(&signing)?,
            encryption: EncryptionKeyPair::from_bytes(&encryption),
        };

        signing.zeroize();
        encryption.zeroize();

        Ok(pair)
    }

    /// Create an independent copy that owns its own key material
    ///
    /// `Clone` is intentionally not derived because of `ZeroizeOnDrop`; this
    /// reconstructs the pair from its raw secret bytes instead.
    pub fn duplicate(&self) -> Result<Self> {
        Self::from_secret_bytes(self.secret_bytes().as_ref())
    }
}

/// Ed25519 signing keypair
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    /// Private signing key (secret)
    #[zeroize(skip)] // ed25519_dalek::SigningKey handles its own zeroization
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Self {
        let secret = SigningKey::generate(&mut OsRng);
        Self { secret }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret = SigningKey::from_bytes(bytes);
        Ok(Self { secret })
    }

    /// Get the secret key bytes (for wrapping/storage)
    ///
    /// ## Security Warning
    ///
    /// Only use this for encryption into a key package. Never log or
    /// transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.secret.verifying_key().to_bytes()
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.secret.verifying_key()
    }

    /// Get reference to the signing key
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// X25519 encryption keypair for key exchange
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    /// Private encryption key (secret)
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    /// Public encryption key (derived from secret)
    public: X25519PublicKey,
}

impl EncryptionKeyPair {
    /// Generate a new random encryption keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the secret key bytes (for wrapping/storage)
    ///
    /// ## Security Warning
    ///
    /// Only use this for encryption into a key package. Never log or
    /// transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Perform Diffie-Hellman key exchange
    ///
    /// Returns a shared secret that both parties can compute:
    /// - Wrapper: ephemeral_secret × recipient_public
    /// - Unwrapper: recipient_secret × ephemeral_public
    ///
    /// Both computations produce the same shared secret.
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        let their_public = X25519PublicKey::from(*their_public);
        self.secret.diffie_hellman(&their_public).to_bytes()
    }
}

/// Public keys that can be safely shared with others
///
/// This contains only public information and can be serialized,
/// transmitted, and stored without security concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKey {
    /// Ed25519 public key for signature verification (32 bytes)
    #[serde(with = "hex_bytes")]
    pub signing: [u8; 32],

    /// X25519 public key for encryption (32 bytes)
    #[serde(with = "hex_bytes")]
    pub encryption: [u8; 32],
}

impl PublicKey {
    /// Create a PublicKey from raw bytes
    pub fn from_bytes(signing: [u8; 32], encryption: [u8; 32]) -> Self {
        Self { signing, encryption }
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.signing)
            .map_err(|e| Error::InvalidKey(format!("Invalid signing public key: {}", e)))
    }
}

/// Serde helper for serializing byte arrays as hex
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
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
