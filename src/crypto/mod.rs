//! # Cryptography Module
//!
//! This module provides the cryptographic primitives consumed by the key
//! management core. The core treats them as trusted collaborators: the
//! activation pipeline composes them but never reimplements them.
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | Ed25519 | Signed key lists | Fast, small keys, widely audited |
//! | X25519 | Member key wrapping | Fast ECDH, same curve as Ed25519 |
//! | AES-256-GCM | Key package encryption | Hardware acceleration, AEAD |
//! | HKDF-SHA256 | Wrap key derivation | Industry standard, well-analyzed |
//! | Argon2id | Mailbox secret KDF | Memory-hard, resists offline guessing |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Constant-Time Operations**: Using dalek for constant-time crypto
//! 3. **Secure Random**: Using `rand::rngs::OsRng` for cryptographic randomness
//! 4. **No Key Reuse**: Unique nonces and salts for every wrap operation

mod keys;
mod encryption;
mod signing;
mod kdf;

pub use keys::{KeyPair, PublicKey, SigningKeyPair, EncryptionKeyPair, SECRET_BYTES_SIZE};
pub use encryption::{encrypt, decrypt, SharedSecret, Nonce, EncryptionKey, NONCE_SIZE};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};
pub use kdf::{derive_keys_from_seed, derive_mailbox_key, key_fingerprint, DerivedKeys, MAILBOX_SALT_SIZE};

/// Size of encryption keys in bytes (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Size of signing keys in bytes (256 bits)
pub const SIGNING_KEY_SIZE: usize = 32;

/// Size of public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
