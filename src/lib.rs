//! # MailVault Core
//!
//! Account key-management core for the MailVault encrypted mail client: one
//! primary account key, per-address dependent keys, and the activation
//! pipeline that promotes dormant wrapped keys into usable, server-registered
//! keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       MAILVAULT CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │  keys                                                         │     │
//! │  │                                                               │     │
//! │  │  - ActivationService: unwrap → manifest → re-wrap → submit    │     │
//! │  │  - KeyStore: per-context registry of decrypted keys           │     │
//! │  │  - Signed key lists, key packages, key info                   │     │
//! │  └──────┬─────────────────────────────────────────────┬──────────┘     │
//! │         │                                             │                │
//! │         ▼                                             ▼                │
//! │  ┌─────────────────────────────┐   ┌─────────────────────────────────┐ │
//! │  │   crypto                    │   │   remote                        │ │
//! │  │                             │   │                                 │ │
//! │  │ - Ed25519 / X25519          │   │ - RemoteKeyService boundary     │ │
//! │  │ - AES-256-GCM               │   │ - In-memory backend (dev/test)  │ │
//! │  │ - HKDF / Argon2id           │   │                                 │ │
//! │  └─────────────────────────────┘   └─────────────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives (keys, encryption, signing, KDFs)
//! - [`keys`] - Key lifecycle: store, packages, manifests, activation
//! - [`remote`] - Server-side key registry boundary
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY PROTECTION LAYERS                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Keys at rest (Argon2id + AES-256-GCM)                        │
//! │  ───────────────────────────────────────────────                        │
//! │  Every stored private key is wrapped under a key derived from the      │
//! │  user's mailbox secret. The server only ever sees ciphertext.          │
//! │                                                                         │
//! │  Layer 2: Keys in transit to members (X25519 + AES-256-GCM)            │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Dependent address keys are provisioned wrapped under the account's    │
//! │  primary key and only become usable through activation.                │
//! │                                                                         │
//! │  Layer 3: Key authenticity (Ed25519 signed key lists)                  │
//! │  ────────────────────────────────────────────────────                   │
//! │  Every activation publishes a manifest signed with the activated key,  │
//! │  so peers can detect server-substituted key material.                  │
//! │                                                                         │
//! │  Layer 4: Memory hygiene (zeroize)                                     │
//! │  ─────────────────────────────────                                      │
//! │  Decrypted key material and derived wrap keys are zeroized on drop     │
//! │  and held only for the duration of the operation that needs them.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod keys;
pub mod remote;
/// Time utilities shared across the crate.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{KeyPair, PublicKey, SharedSecret};
pub use error::{Error, Result};
pub use keys::{
    ActivationReport, ActivationService, Address, AddressId, AddressKey, KeyContext, KeyFlags,
    KeyId, KeyState, KeyStore, MailboxSecret,
};
pub use remote::{ActivationPayload, InMemoryKeyService, RemoteKeyService};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of MailVault Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
