//! Key metadata extraction.
//!
//! Parses a decrypted key package into the structured metadata the key store
//! holds next to the key material. Pure: no side effects, no store access.

use serde::{Deserialize, Serialize};

use crate::crypto::{key_fingerprint, KeyPair};
use crate::keys::{KeyFlags, KeyId};
use crate::time;

/// Structured metadata of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Opaque key id
    pub id: KeyId,
    /// Fingerprint over the public halves (SHA-256, hex)
    pub fingerprint: String,
    /// Capability flags
    pub flags: KeyFlags,
    /// Whether the key material is decrypted and usable
    pub decrypted: bool,
    /// Unix timestamp when this record was produced
    pub created_at: i64,
}

/// Extract metadata from a decrypted key package
///
/// The returned record is marked `decrypted: true`; only usable keys are
/// ever formatted for storage.
pub fn extract_key_info(id: &KeyId, pair: &KeyPair, flags: &KeyFlags) -> KeyInfo {
    KeyInfo {
        id: *id,
        fingerprint: key_fingerprint(
            &pair.signing.public_bytes(),
            &pair.encryption.public_bytes(),
        ),
        flags: *flags,
        decrypted: true,
        created_at: time::now_timestamp(),
    }
}
