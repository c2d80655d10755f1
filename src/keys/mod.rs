//! # Key Management Module
//!
//! Lifecycle management for the account's primary key and per-address keys,
//! centered on the activation pipeline that promotes dormant, wrapped address
//! keys into usable, server-registered, locally cached keys.
//!
//! ## Activation Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       KEY ACTIVATION PIPELINE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Input: addresses with pending keys + mailbox secret                   │
//! │                                                                         │
//! │  1. Filter                                                             │
//! │     ┌──────────────────────────────────────────────────────────┐       │
//! │     │ Keep addresses that carry at least one key wrapped under │       │
//! │     │ the primary key. Nothing pending → return immediately.   │       │
//! │     └──────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  2. Resolve primary key (once)                                         │
//! │     ┌──────────────────────────────────────────────────────────┐       │
//! │     │ KeyStore[Main][0] — must already be unlocked.            │       │
//! │     │ Missing → the whole batch fails, nothing is attempted.   │       │
//! │     └──────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  3. Per address (concurrent)        Per key (sequential, in order)     │
//! │     ┌──────────────┐                ┌───────────────────────────┐      │
//! │     │  address A1  │──────────────► │ claim  (Pending→Activating)│     │
//! │     │  address A2  │                │ unwrap (primary key ECDH) │      │
//! │     │  address A3  │                │ build signed key list  +  │      │
//! │     │  ...         │                │ re-wrap under mailbox key │      │
//! │     └──────────────┘                │ submit to remote service  │      │
//! │        join_all                     │ extract key info          │      │
//! │                                     │ append to KeyStore        │      │
//! │                                     └───────────────────────────┘      │
//! │                                                                         │
//! │  Failure of one key marks it Failed and moves on; sibling keys and     │
//! │  sibling addresses are unaffected.                                     │
//! │                                                                         │
//! │  Output: ActivationReport (terminal state per attempted key)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key States
//!
//! ```text
//! PendingActivation ──► Activating ──► Activated   (terminal)
//!                           │
//!                           └────────► Failed      (terminal for the batch;
//!                                                   a later caller-driven
//!                                                   run may claim it again)
//! ```

mod account;
mod activation;
mod info;
mod package;
mod signed_key_list;
mod store;
mod unwrap;

pub use account::{unlock_account, unlock_address_keys, AccountKeys};
pub use activation::{ActivationReport, ActivationService, KeyOutcome};
pub use info::{extract_key_info, KeyInfo};
pub use package::{EncryptedPrivateKey, LockedKeyPackage, KEY_PACKAGE_VERSION};
pub use signed_key_list::{
    build_signed_key_list, verify_signed_key_list, SignedKeyList, SignedKeyListEntry, SklMode,
};
pub use store::{ClaimGuard, KeyStore, StoredKey};
pub use unwrap::{decrypt_member_key, wrap_member_key};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Opaque identifier of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressId(Uuid);

impl AddressId {
    /// Generate a fresh address id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AddressId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AddressId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier of a key record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(Uuid);

impl KeyId {
    /// Generate a fresh key id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Bytes used to bind ciphertexts to this key (AEAD associated data)
    pub fn as_aad(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for KeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Logical partition of the key store
///
/// The account's primary key lives under `Main`; each address's keys live
/// under their own context. Contexts are locked independently, so stores for
/// unrelated addresses never contend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyContext {
    /// The account's primary key context
    Main,
    /// A per-address context
    Address(AddressId),
}

/// Capability flags of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFlags {
    /// Key may sign (manifests, outgoing mail)
    pub signing: bool,
    /// Key may be encrypted to (incoming mail)
    pub encryption: bool,
}

impl KeyFlags {
    /// Full capability set: signing and encryption
    pub fn full() -> Self {
        Self { signing: true, encryption: true }
    }

    /// Compact bit representation used in key list manifests
    pub fn bits(&self) -> u8 {
        (self.signing as u8) | ((self.encryption as u8) << 1)
    }

    /// Parse from the compact bit representation
    pub fn from_bits(bits: u8) -> Self {
        Self {
            signing: bits & 0b01 != 0,
            encryption: bits & 0b10 != 0,
        }
    }
}

/// Lifecycle state of a key record
///
/// `Activated` and `Failed` are terminal within one activation batch and are
/// never transitioned out of automatically. A later, caller-driven run may
/// claim a `Failed` key again; an `Activated` key is never re-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// Wrapped under the primary key, waiting for activation
    PendingActivation,
    /// Claimed by a running activation
    Activating,
    /// Activated, registered remotely and cached locally
    Activated,
    /// Activation failed; not retried automatically
    Failed,
}

/// A key record attached to an address
///
/// All fields are declared up front; there is no call-site defaulting. A key
/// whose `activation` package is present is pending activation: its material
/// is wrapped under the account's primary key and unusable until promoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressKey {
    /// Opaque key id
    pub id: KeyId,
    /// Capability flags
    pub flags: KeyFlags,
    /// Private key wrapped under the mailbox key (absent until activated)
    pub private_key: Option<EncryptedPrivateKey>,
    /// Activation package wrapped under the primary key (present while pending)
    pub activation: Option<LockedKeyPackage>,
}

impl AddressKey {
    /// Whether this key is waiting to be activated
    pub fn is_pending_activation(&self) -> bool {
        self.activation.is_some()
    }
}

/// An address owned by the account, with its ordered key list
///
/// Key order is significant: keys are activated strictly in list order, and
/// the first stored key of a context is treated as its primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Opaque address id
    pub id: AddressId,
    /// Mail address string (display only, never used as an identifier)
    pub email: String,
    /// Ordered key records
    pub keys: Vec<AddressKey>,
}

impl Address {
    /// Whether any key of this address is pending activation
    pub fn has_pending_activation(&self) -> bool {
        self.keys.iter().any(AddressKey::is_pending_activation)
    }
}

/// The user's mailbox secret
///
/// Opaque secret bytes supplied by the caller; zeroized on drop. Only ever
/// fed into the Argon2id derivation that produces key-wrapping keys.
pub struct MailboxSecret(Zeroizing<Vec<u8>>);

impl MailboxSecret {
    /// Wrap caller-supplied secret bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Access the raw secret bytes (for key derivation only)
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for MailboxSecret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_flags_bits_round_trip() {
        let flags = KeyFlags { signing: true, encryption: false };
        assert_eq!(KeyFlags::from_bits(flags.bits()), flags);

        let full = KeyFlags::full();
        assert_eq!(full.bits(), 0b11);
        assert_eq!(KeyFlags::from_bits(0b11), full);
    }

    #[test]
    fn test_address_pending_detection() {
        let address = Address {
            id: AddressId::new(),
            email: "user@example.com".into(),
            keys: vec![AddressKey {
                id: KeyId::new(),
                flags: KeyFlags::full(),
                private_key: None,
                activation: None,
            }],
        };
        assert!(!address.has_pending_activation());
    }

    #[test]
    fn test_context_partitioning() {
        let a = KeyContext::Address(AddressId::new());
        let b = KeyContext::Address(AddressId::new());

        assert_ne!(a, b);
        assert_ne!(a, KeyContext::Main);
    }
}
