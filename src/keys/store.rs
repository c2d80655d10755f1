//! # Key Store
//!
//! Process-wide, in-memory registry of decrypted key records, partitioned by
//! context (the account's main context or one per-address context).
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEY STORE LOCKING                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  KeyStore                                                               │
//! │  ├── contexts: RwLock<HashMap<KeyContext, slot>>                       │
//! │  │             (held only to look up / insert a slot)                  │
//! │  │                                                                      │
//! │  │     slot = Arc<Mutex<Vec<StoredKey>>>                               │
//! │  │            (per-context exclusion: appends to one context           │
//! │  │             serialize; unrelated contexts never contend)            │
//! │  │                                                                      │
//! │  └── lifecycle: Mutex<HashMap<KeyId, KeyState>>                        │
//! │                 (atomic activation claims)                             │
//! │                                                                         │
//! │  Reads return a cloned snapshot of a context's list — never a torn     │
//! │  view. Writes append; an existing record is never mutated in place,    │
//! │  so a reader racing an activation sees either the old or the new       │
//! │  list, both consistent.                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store is an explicit, constructed object passed by handle
//! (`Arc<KeyStore>`) to collaborators. It is deliberately not a process
//! global.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::crypto::KeyPair;
use crate::error::{Error, Result};
use crate::keys::{KeyContext, KeyId, KeyInfo, KeyState};

/// A fully-formed key record held by the store
///
/// Pairs the extracted metadata with a shared handle to the decrypted key
/// material. Cloning is cheap; the material itself is owned once.
#[derive(Clone)]
pub struct StoredKey {
    /// Extracted metadata
    pub info: KeyInfo,
    /// Decrypted key material
    pub pair: Arc<KeyPair>,
}

/// Process-wide registry of decrypted keys
pub struct KeyStore {
    /// Per-context record lists
    contexts: RwLock<HashMap<KeyContext, Arc<Mutex<Vec<StoredKey>>>>>,
    /// Activation lifecycle registry
    lifecycle: Mutex<HashMap<KeyId, KeyState>>,
}

impl KeyStore {
    /// Create an empty key store
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the slot for a context
    fn slot(&self, context: KeyContext) -> Arc<Mutex<Vec<StoredKey>>> {
        if let Some(slot) = self.contexts.read().get(&context) {
            return Arc::clone(slot);
        }

        let mut contexts = self.contexts.write();
        Arc::clone(contexts.entry(context).or_default())
    }

    /// Append fully-formed records to a context
    ///
    /// Appends are atomic per context: two concurrent `store_keys` calls for
    /// the same context serialize on its mutex and neither update is lost.
    /// Records for other contexts are unaffected.
    pub fn store_keys(&self, context: KeyContext, records: Vec<StoredKey>) {
        let slot = self.slot(context);
        let mut list = slot.lock();
        let count = records.len();
        list.extend(records);

        tracing::debug!(
            "Stored {} key record(s), context now holds {}",
            count,
            list.len()
        );
    }

    /// Read a consistent snapshot of a context's records
    ///
    /// The first entry is conventionally the default/primary key for that
    /// context. Returns an empty vector for an unknown context.
    pub fn private_keys(&self, context: KeyContext) -> Vec<StoredKey> {
        match self.contexts.read().get(&context) {
            Some(slot) => slot.lock().clone(),
            None => Vec::new(),
        }
    }

    /// Get the primary (first) key of a context
    pub fn primary_key(&self, context: KeyContext) -> Option<StoredKey> {
        self.contexts
            .read()
            .get(&context)
            .and_then(|slot| slot.lock().first().cloned())
    }

    // ========================================================================
    // ACTIVATION LIFECYCLE
    // ========================================================================

    /// Atomically claim a key for activation
    ///
    /// Transitions `PendingActivation` (or a previous `Failed`) to
    /// `Activating`. A key that is already `Activating` or `Activated` cannot
    /// be claimed, which is what makes a concurrent re-invocation of the
    /// pipeline skip instead of double-processing.
    ///
    /// The returned guard must be resolved with [`ClaimGuard::complete`] or
    /// [`ClaimGuard::fail`]; dropping it unresolved (e.g. the activation
    /// future was cancelled) records the key as `Failed`.
    pub fn begin_activation(&self, key_id: KeyId) -> Result<ClaimGuard<'_>> {
        let mut lifecycle = self.lifecycle.lock();

        match lifecycle.get(&key_id) {
            Some(KeyState::Activating) | Some(KeyState::Activated) => {
                return Err(Error::KeyAlreadyActive(key_id.to_string()));
            }
            None | Some(KeyState::PendingActivation) | Some(KeyState::Failed) => {}
        }

        lifecycle.insert(key_id, KeyState::Activating);

        Ok(ClaimGuard {
            store: self,
            key_id,
            resolved: false,
        })
    }

    /// Look up the lifecycle state of a key
    ///
    /// Returns `None` for keys the store has never seen a claim for.
    pub fn key_state(&self, key_id: &KeyId) -> Option<KeyState> {
        self.lifecycle.lock().get(key_id).copied()
    }

    fn resolve_claim(&self, key_id: KeyId, state: KeyState) {
        self.lifecycle.lock().insert(key_id, state);
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("context_count", &self.contexts.read().len())
            .field("tracked_keys", &self.lifecycle.lock().len())
            .finish()
    }
}

/// RAII claim over one key's activation
///
/// Holds the `Activating` state for a key. Must be resolved exactly once;
/// dropping the guard unresolved maps the key to `Failed`, so a cancelled
/// activation can never strand a record in `Activating`.
#[must_use = "a claim must be resolved with complete() or fail()"]
pub struct ClaimGuard<'a> {
    store: &'a KeyStore,
    key_id: KeyId,
    resolved: bool,
}

impl ClaimGuard<'_> {
    /// Mark the key as activated (terminal)
    pub fn complete(mut self) {
        self.resolved = true;
        self.store.resolve_claim(self.key_id, KeyState::Activated);
    }

    /// Mark the key as failed (terminal for this batch)
    pub fn fail(mut self, reason: &str) {
        self.resolved = true;
        tracing::warn!("Key {} activation failed: {}", self.key_id, reason);
        self.store.resolve_claim(self.key_id, KeyState::Failed);
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!("Key {} activation cancelled mid-flight", self.key_id);
            self.store.resolve_claim(self.key_id, KeyState::Failed);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
