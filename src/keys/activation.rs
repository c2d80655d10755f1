//! # Activation Pipeline
//!
//! Orchestrates the promotion of dormant, wrapped address keys into usable,
//! server-registered, locally cached keys.
//!
//! ## Pipeline Steps (per key)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PER-KEY ACTIVATION STEPS                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  claim      KeyStore lifecycle: Pending → Activating (atomic)          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  unwrap     decrypt the member key package with the primary key        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  build      signed key list + private key re-wrapped under the         │
//! │             mailbox secret — one step, one decrypted instance          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  submit     RemoteKeyService.activate_key — must fully succeed         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  extract    key info (fingerprint, flags, decrypted marker)            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  store      append to the address's KeyStore context, then resolve     │
//! │             the claim to Activated                                     │
//! │                                                                         │
//! │  Any failing step resolves the claim to Failed and the loop moves      │
//! │  on to the next pending key of the same address.                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Addresses are independent units of work and run concurrently on the
//! caller's task via `join_all` — cooperative multiplexing, no spawned
//! threads, so a stuck submission stalls only its own address. Keys within
//! one address run strictly sequentially in list order: key N+1 does not
//! start until key N is terminal, and N's stored record is visible in the
//! address context before N+1 builds its manifest.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{
    build_signed_key_list, decrypt_member_key, extract_key_info, Address, AddressId, AddressKey,
    KeyContext, KeyId, KeyState, KeyStore, MailboxSecret, SklMode, StoredKey,
};
use crate::remote::{ActivationPayload, RemoteKeyService};

/// Terminal outcome of one attempted key activation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyOutcome {
    /// Address the key belongs to
    pub address_id: AddressId,
    /// The key that was attempted
    pub key_id: KeyId,
    /// Terminal state reached (`Activated` or `Failed`)
    pub state: KeyState,
    /// Failure description when `state` is `Failed`
    pub error: Option<String>,
}

/// Per-key terminal states of one activation batch
///
/// The pipeline never raises per-key failures; callers inspect the report
/// post-hoc instead of catching a single rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Outcome of every attempted key, in completion order
    pub outcomes: Vec<KeyOutcome>,
}

impl ActivationReport {
    /// Number of keys that reached `Activated`
    pub fn activated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == KeyState::Activated)
            .count()
    }

    /// Number of keys that reached `Failed`
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == KeyState::Failed)
            .count()
    }

    /// Look up the outcome for one key
    pub fn outcome_for(&self, key_id: &KeyId) -> Option<&KeyOutcome> {
        self.outcomes.iter().find(|o| o.key_id == *key_id)
    }
}

/// The key activation pipeline
///
/// Composes the key store and the remote key service; both are shared
/// handles so the service itself stays cheap to clone around.
pub struct ActivationService<R: RemoteKeyService> {
    /// Local registry of decrypted keys
    store: Arc<KeyStore>,
    /// Server-side key registry boundary
    remote: Arc<R>,
}

impl<R: RemoteKeyService> ActivationService<R> {
    /// Create a new activation service
    pub fn new(store: Arc<KeyStore>, remote: Arc<R>) -> Self {
        Self { store, remote }
    }

    /// Activate every pending key across the given addresses
    ///
    /// Addresses run concurrently; keys within one address sequentially in
    /// list order. Resolves once every attempted key is terminal.
    ///
    /// Returns immediately with an empty report when no address has a
    /// pending key — no store reads, no network calls.
    ///
    /// ## Errors
    ///
    /// `PrimaryKeyUnavailable` when the account's primary key is not
    /// unlocked in the store; nothing is attempted in that case. All other
    /// failures are per-key and land in the report, never here.
    ///
    /// No automatic retry happens at any level: re-running activation is a
    /// caller decision, and is safe because activated keys cannot be
    /// claimed again.
    pub async fn activate(
        &self,
        addresses: &[Address],
        mailbox_secret: &MailboxSecret,
    ) -> Result<ActivationReport> {
        let pending: Vec<&Address> = addresses
            .iter()
            .filter(|a| a.has_pending_activation())
            .collect();

        if pending.is_empty() {
            return Ok(ActivationReport::default());
        }

        // Resolve the primary key once; it must already be unlocked.
        let primary = self
            .store
            .primary_key(KeyContext::Main)
            .ok_or(Error::PrimaryKeyUnavailable)?;

        tracing::info!("Activating pending keys across {} address(es)", pending.len());

        let tasks = pending
            .iter()
            .map(|address| self.activate_address_keys(address, &primary, mailbox_secret));

        let outcomes: Vec<KeyOutcome> = join_all(tasks).await.into_iter().flatten().collect();

        let report = ActivationReport { outcomes };
        tracing::info!(
            "Activation finished: {} activated, {} failed",
            report.activated_count(),
            report.failed_count()
        );

        Ok(report)
    }

    /// Activate the pending keys of one address, in list order
    async fn activate_address_keys(
        &self,
        address: &Address,
        primary: &StoredKey,
        mailbox_secret: &MailboxSecret,
    ) -> Vec<KeyOutcome> {
        let mut outcomes = Vec::new();

        for key in &address.keys {
            if !key.is_pending_activation() {
                continue;
            }

            let claim = match self.store.begin_activation(key.id) {
                Ok(claim) => claim,
                Err(_) => {
                    // Claimed by a concurrent run or already activated
                    tracing::debug!("Skipping key {}: already claimed", key.id);
                    continue;
                }
            };

            match self
                .activate_key(address, key, primary, mailbox_secret)
                .await
            {
                Ok(stored) => {
                    // The stored record must be visible before the next key
                    // of this address starts processing.
                    self.store
                        .store_keys(KeyContext::Address(address.id), vec![stored]);
                    claim.complete();

                    tracing::debug!("Activated key {} for address {}", key.id, address.id);
                    outcomes.push(KeyOutcome {
                        address_id: address.id,
                        key_id: key.id,
                        state: KeyState::Activated,
                        error: None,
                    });
                }
                Err(err) => {
                    claim.fail(&err.to_string());
                    outcomes.push(KeyOutcome {
                        address_id: address.id,
                        key_id: key.id,
                        state: KeyState::Failed,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        outcomes
    }

    /// Run the per-key steps: unwrap, build, submit, extract
    ///
    /// The decrypted pair lives only inside this call and the returned
    /// record; nothing else retains it.
    async fn activate_key(
        &self,
        address: &Address,
        key: &AddressKey,
        primary: &StoredKey,
        mailbox_secret: &MailboxSecret,
    ) -> Result<StoredKey> {
        let package = key
            .activation
            .as_ref()
            .ok_or_else(|| Error::StoreConsistency("Pending key lost its package".into()))?;

        let pair = decrypt_member_key(package, &primary.pair, &key.id)?;

        let existing = self.store.private_keys(KeyContext::Address(address.id));
        let (signed_key_list, private_key) = build_signed_key_list(
            &address.id,
            &pair,
            &key.id,
            &key.flags,
            &existing,
            SklMode::Create,
            mailbox_secret.expose(),
        )?;

        // The submission must fully succeed before the key counts as
        // activated; a failure here leaves no local trace.
        self.remote
            .activate_key(&key.id, ActivationPayload { private_key, signed_key_list })
            .await?;

        let info = extract_key_info(&key.id, &pair, &key.flags);

        Ok(StoredKey {
            info,
            pair: Arc::new(pair),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use parking_lot::Mutex;

    use super::*;
    use crate::crypto::KeyPair;
    use crate::keys::{verify_signed_key_list, wrap_member_key, KeyFlags};

    /// Remote double that records submissions and can fail selected keys
    struct RecordingRemote {
        calls: Mutex<Vec<(KeyId, ActivationPayload)>>,
        fail_on: Mutex<HashSet<KeyId>>,
    }

    impl RecordingRemote {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: Mutex::new(HashSet::new()),
            }
        }

        fn fail_key(&self, key_id: KeyId) {
            self.fail_on.lock().insert(key_id);
        }

        fn call_order(&self) -> Vec<KeyId> {
            self.calls.lock().iter().map(|(id, _)| *id).collect()
        }

        fn payload_for(&self, key_id: &KeyId) -> Option<ActivationPayload> {
            self.calls
                .lock()
                .iter()
                .find(|(id, _)| id == key_id)
                .map(|(_, p)| p.clone())
        }
    }

    #[async_trait::async_trait]
    impl RemoteKeyService for RecordingRemote {
        async fn activate_key(&self, key_id: &KeyId, payload: ActivationPayload) -> Result<()> {
            if self.fail_on.lock().contains(key_id) {
                return Err(Error::RemoteSubmissionFailed("simulated rejection".into()));
            }
            self.calls.lock().push((*key_id, payload));
            Ok(())
        }
    }

    /// Store seeded with an unlocked primary key under the main context
    fn store_with_primary() -> (Arc<KeyStore>, StoredKey) {
        let store = Arc::new(KeyStore::new());

        let pair = KeyPair::generate();
        let id = KeyId::new();
        let info = extract_key_info(&id, &pair, &KeyFlags::full());
        let primary = StoredKey { info, pair: Arc::new(pair) };

        store.store_keys(KeyContext::Main, vec![primary.clone()]);
        (store, primary)
    }

    /// An address key wrapped under the primary key, pending activation
    fn pending_key(primary: &StoredKey) -> AddressKey {
        let id = KeyId::new();
        let member = KeyPair::generate();
        let package =
            wrap_member_key(&member, &primary.pair.encryption.public_bytes(), &id).unwrap();

        AddressKey {
            id,
            flags: KeyFlags::full(),
            private_key: None,
            activation: Some(package),
        }
    }

    fn address_with(keys: Vec<AddressKey>) -> Address {
        Address {
            id: AddressId::new(),
            email: "user@example.com".into(),
            keys,
        }
    }

    fn service(
        store: &Arc<KeyStore>,
        remote: &Arc<RecordingRemote>,
    ) -> ActivationService<RecordingRemote> {
        ActivationService::new(Arc::clone(store), Arc::clone(remote))
    }

    #[tokio::test]
    async fn test_noop_when_nothing_pending() {
        // Deliberately no primary key: the early return must fire before
        // the primary lookup
        let store = Arc::new(KeyStore::new());
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let active_only = address_with(vec![AddressKey {
            id: KeyId::new(),
            flags: KeyFlags::full(),
            private_key: None,
            activation: None,
        }]);

        let report = svc
            .activate(&[active_only], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(remote.call_order().is_empty());
    }

    #[tokio::test]
    async fn test_missing_primary_key_fails_batch() {
        let store = Arc::new(KeyStore::new());
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        // A pending key exists but the main context is empty
        let (_, foreign_primary) = store_with_primary();
        let address = address_with(vec![pending_key(&foreign_primary)]);

        let result = svc.activate(&[address], &MailboxSecret::from("pw")).await;

        assert!(matches!(result, Err(Error::PrimaryKeyUnavailable)));
        assert!(remote.call_order().is_empty());
    }

    #[tokio::test]
    async fn test_single_key_happy_path() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let key = pending_key(&primary);
        let key_id = key.id;
        let address = address_with(vec![key]);
        let address_id = address.id;

        let report = svc
            .activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        // Exactly one remote call, for this key
        assert_eq!(remote.call_order(), vec![key_id]);

        // Exactly one stored record under the address context
        let stored = store.private_keys(KeyContext::Address(address_id));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].info.id, key_id);
        assert!(stored[0].info.decrypted);

        // Terminal state is Activated
        assert_eq!(store.key_state(&key_id), Some(KeyState::Activated));
        assert_eq!(report.activated_count(), 1);
        assert_eq!(report.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_isolation_across_addresses() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let good = pending_key(&primary);
        let good_id = good.id;
        let a1 = address_with(vec![good]);

        // A2's key package is wrapped under a different primary key
        let (_, wrong_primary) = store_with_primary();
        let bad = pending_key(&wrong_primary);
        let bad_id = bad.id;
        let a2 = address_with(vec![bad]);
        let a2_id = a2.id;

        let report = svc
            .activate(&[a1, a2], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert_eq!(store.key_state(&good_id), Some(KeyState::Activated));
        assert_eq!(store.key_state(&bad_id), Some(KeyState::Failed));

        // Exactly one successful remote call and one store append
        assert_eq!(remote.call_order(), vec![good_id]);
        assert!(store.private_keys(KeyContext::Address(a2_id)).is_empty());

        let bad_outcome = report.outcome_for(&bad_id).unwrap();
        assert!(bad_outcome.error.as_deref().unwrap().contains("unwrap"));
    }

    #[tokio::test]
    async fn test_failure_isolation_within_address() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let (_, wrong_primary) = store_with_primary();
        let bad = pending_key(&wrong_primary);
        let bad_id = bad.id;
        let good = pending_key(&primary);
        let good_id = good.id;

        // The corrupted key comes first; the later key must still run
        let address = address_with(vec![bad, good]);

        svc.activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert_eq!(store.key_state(&bad_id), Some(KeyState::Failed));
        assert_eq!(store.key_state(&good_id), Some(KeyState::Activated));
    }

    #[tokio::test]
    async fn test_keys_processed_in_list_order() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let k1 = pending_key(&primary);
        let k2 = pending_key(&primary);
        let (id1, id2) = (k1.id, k2.id);
        let address = address_with(vec![k1, k2]);

        svc.activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert_eq!(remote.call_order(), vec![id1, id2]);
    }

    #[tokio::test]
    async fn test_second_key_manifest_sees_first_key() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let k1 = pending_key(&primary);
        let k2 = pending_key(&primary);
        let id2 = k2.id;
        let address = address_with(vec![k1, k2]);

        svc.activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        // K1's stored record was visible when K2 built its manifest
        let payload = remote.payload_for(&id2).unwrap();
        let entries: Vec<crate::keys::SignedKeyListEntry> =
            serde_json::from_str(&payload.signed_key_list.data).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_manifest_matches_submitted_private_key() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let key = pending_key(&primary);
        let key_id = key.id;
        let address = address_with(vec![key]);

        svc.activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        let payload = remote.payload_for(&key_id).unwrap();

        // Round-trip the submitted ciphertext back into key material
        let reopened = payload.private_key.open(&key_id, b"pw").unwrap();

        // The manifest signature verifies under that same material, and the
        // listed fingerprint matches it
        let entries =
            verify_signed_key_list(&payload.signed_key_list, &reopened.signing.public_bytes())
                .unwrap();
        let fingerprint = crate::crypto::key_fingerprint(
            &reopened.signing.public_bytes(),
            &reopened.encryption.public_bytes(),
        );
        assert_eq!(entries[0].fingerprint, fingerprint);
    }

    #[tokio::test]
    async fn test_concurrent_addresses_append_only() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        // One address starts with a pre-existing stored record
        let seeded = address_with(vec![pending_key(&primary)]);
        let seeded_id = seeded.id;
        let preexisting = {
            let pair = KeyPair::generate();
            let id = KeyId::new();
            StoredKey {
                info: extract_key_info(&id, &pair, &KeyFlags::full()),
                pair: Arc::new(pair),
            }
        };
        let preexisting_id = preexisting.info.id;
        store.store_keys(KeyContext::Address(seeded_id), vec![preexisting]);

        let mut addresses = vec![seeded];
        for _ in 0..5 {
            addresses.push(address_with(vec![pending_key(&primary), pending_key(&primary)]));
        }

        let report = svc
            .activate(&addresses, &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert_eq!(report.activated_count(), 11);
        assert_eq!(report.failed_count(), 0);

        // Pre-existing record survived, new one appended after it
        let seeded_keys = store.private_keys(KeyContext::Address(seeded_id));
        assert_eq!(seeded_keys.len(), 2);
        assert_eq!(seeded_keys[0].info.id, preexisting_id);

        // Every other address holds exactly its own two records
        for address in &addresses[1..] {
            assert_eq!(store.private_keys(KeyContext::Address(address.id)).len(), 2);
        }
    }

    #[tokio::test]
    async fn test_reinvocation_skips_activated_keys() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let key = pending_key(&primary);
        let key_id = key.id;
        let address = address_with(vec![key]);
        let addresses = [address];
        let secret = MailboxSecret::from("pw");

        svc.activate(&addresses, &secret).await.unwrap();
        let report = svc.activate(&addresses, &secret).await.unwrap();

        // The second run claimed nothing and called nothing
        assert!(report.outcomes.is_empty());
        assert_eq!(remote.call_order(), vec![key_id]);
        assert_eq!(store.private_keys(KeyContext::Address(addresses[0].id)).len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_no_local_trace() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let key = pending_key(&primary);
        let key_id = key.id;
        remote.fail_key(key_id);
        let address = address_with(vec![key]);
        let address_id = address.id;

        let report = svc
            .activate(&[address], &MailboxSecret::from("pw"))
            .await
            .unwrap();

        assert_eq!(store.key_state(&key_id), Some(KeyState::Failed));
        assert!(store.private_keys(KeyContext::Address(address_id)).is_empty());

        let outcome = report.outcome_for(&key_id).unwrap();
        assert!(outcome.error.as_deref().unwrap().contains("submission"));
    }

    #[tokio::test]
    async fn test_failed_key_retried_on_next_invocation() {
        let (store, primary) = store_with_primary();
        let remote = Arc::new(RecordingRemote::new());
        let svc = service(&store, &remote);

        let key = pending_key(&primary);
        let key_id = key.id;
        let addresses = [address_with(vec![key])];
        let secret = MailboxSecret::from("pw");

        // First run: remote rejects
        remote.fail_key(key_id);
        svc.activate(&addresses, &secret).await.unwrap();
        assert_eq!(store.key_state(&key_id), Some(KeyState::Failed));

        // Caller-driven retry after the rejection clears
        remote.fail_on.lock().clear();
        let report = svc.activate(&addresses, &secret).await.unwrap();

        assert_eq!(report.activated_count(), 1);
        assert_eq!(store.key_state(&key_id), Some(KeyState::Activated));
    }
}
