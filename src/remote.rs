//! # Remote Key Service
//!
//! Boundary to the server-side key registry. Activating a key persists its
//! mailbox-wrapped private key and the address's signed key list to the
//! account's server state, keyed by key id.
//!
//! The transport itself (HTTP client, retry/backoff, auth) is owned by the
//! implementation behind the trait; this crate only defines the contract:
//!
//! - the call must be **idempotent** per key id — re-submitting the same
//!   payload must not create duplicate server state, which is what makes
//!   caller-driven activation retries safe
//! - every failure mode (validation rejection, authorization, transport)
//!   surfaces as `RemoteSubmissionFailed`; finer detail stays in the message

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::Result;
use crate::keys::{EncryptedPrivateKey, KeyId, SignedKeyList};

/// Payload persisted when a key is activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPayload {
    /// The private key re-wrapped under the mailbox secret
    pub private_key: EncryptedPrivateKey,
    /// The manifest of keys now valid for the owning address
    pub signed_key_list: SignedKeyList,
}

/// Server-side key registry boundary
#[async_trait]
pub trait RemoteKeyService: Send + Sync {
    /// Persist an activated key
    ///
    /// Must fully succeed before the key may be considered activated.
    ///
    /// ## Errors
    ///
    /// Returns `RemoteSubmissionFailed` for rejections and transport
    /// failures alike.
    async fn activate_key(&self, key_id: &KeyId, payload: ActivationPayload) -> Result<()>;
}

/// In-memory key service backend
///
/// For development and testing; in production the trait is implemented over
/// the account API client. Idempotent: re-activating a key id replaces its
/// payload.
pub struct InMemoryKeyService {
    activated: RwLock<HashMap<KeyId, ActivationPayload>>,
}

impl InMemoryKeyService {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            activated: RwLock::new(HashMap::new()),
        }
    }

    /// Number of activated keys
    pub fn activated_count(&self) -> usize {
        self.activated.read().len()
    }

    /// Look up the stored payload for a key
    pub fn payload_for(&self, key_id: &KeyId) -> Option<ActivationPayload> {
        self.activated.read().get(key_id).cloned()
    }
}

impl Default for InMemoryKeyService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteKeyService for InMemoryKeyService {
    async fn activate_key(&self, key_id: &KeyId, payload: ActivationPayload) -> Result<()> {
        self.activated.write().insert(*key_id, payload);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
