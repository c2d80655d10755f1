//! Account key unlock.
//!
//! Seeds the key store's main context from the account's wrapped key records
//! at load time. Activation requires the primary key to already be unlocked;
//! this is the step that establishes that precondition.

use std::sync::Arc;

use crate::error::Result;
use crate::keys::{
    extract_key_info, Address, EncryptedPrivateKey, KeyContext, KeyFlags, KeyId, KeyStore,
    MailboxSecret, StoredKey,
};

/// One account-level key record as delivered by the account-load collaborator
#[derive(Debug, Clone)]
pub struct AccountKeys {
    /// Opaque key id
    pub id: KeyId,
    /// Capability flags
    pub flags: KeyFlags,
    /// Private key wrapped under the mailbox key
    pub private_key: EncryptedPrivateKey,
}

/// Unlock the account's keys into the store's main context
///
/// Opens each wrapped record with the mailbox secret and appends it, in
/// order, under [`KeyContext::Main`]. The first record becomes the primary
/// key the activation pipeline resolves.
///
/// ## Errors
///
/// Fails on the first record that cannot be opened (wrong mailbox secret or
/// corrupted record); nothing beyond the already-stored records is kept.
pub fn unlock_account(
    store: &KeyStore,
    account_keys: &[AccountKeys],
    mailbox_secret: &MailboxSecret,
) -> Result<()> {
    for record in account_keys {
        let pair = record
            .private_key
            .open(&record.id, mailbox_secret.expose())?;

        let info = extract_key_info(&record.id, &pair, &record.flags);
        store.store_keys(
            KeyContext::Main,
            vec![StoredKey { info, pair: Arc::new(pair) }],
        );
    }

    tracing::info!("Unlocked {} account key(s)", account_keys.len());
    Ok(())
}

/// Unlock already-activated address keys into their per-address contexts
///
/// Opens every key that carries a mailbox-wrapped private key and appends it
/// under its address's context, preserving list order. Keys still pending
/// activation are skipped; the activation pipeline owns those. Because the
/// store is rebuilt from server truth here, a run that registered a key
/// remotely but crashed before caching it locally heals on the next load.
///
/// ## Errors
///
/// Fails on the first record that cannot be opened; previously stored
/// records are kept.
pub fn unlock_address_keys(
    store: &KeyStore,
    addresses: &[Address],
    mailbox_secret: &MailboxSecret,
) -> Result<()> {
    let mut unlocked = 0usize;

    for address in addresses {
        for key in &address.keys {
            let Some(private_key) = &key.private_key else {
                continue;
            };

            let pair = private_key.open(&key.id, mailbox_secret.expose())?;
            let info = extract_key_info(&key.id, &pair, &key.flags);
            store.store_keys(
                KeyContext::Address(address.id),
                vec![StoredKey { info, pair: Arc::new(pair) }],
            );
            unlocked += 1;
        }
    }

    tracing::info!("Unlocked {} address key(s)", unlocked);
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn wrapped_record(secret: &[u8]) -> (AccountKeys, KeyPair) {
        let pair = KeyPair::generate();
        let id = KeyId::new();
        let private_key = EncryptedPrivateKey::seal(&pair, &id, secret).unwrap();
        let copy = pair.duplicate().unwrap();

        (
            AccountKeys { id, flags: KeyFlags::full(), private_key },
            copy,
        )
    }

    #[test]
    fn test_unlock_seeds_main_context() {
        let store = KeyStore::new();
        let secret = MailboxSecret::from("pw");
        let (record, original) = wrapped_record(b"pw");

        unlock_account(&store, &[record], &secret).unwrap();

        let primary = store.primary_key(KeyContext::Main).unwrap();
        assert_eq!(primary.pair.public_keys(), original.public_keys());
        assert!(primary.info.decrypted);
    }

    #[test]
    fn test_unlock_preserves_order() {
        let store = KeyStore::new();
        let secret = MailboxSecret::from("pw");
        let (first, _) = wrapped_record(b"pw");
        let first_id = first.id;
        let (second, _) = wrapped_record(b"pw");

        unlock_account(&store, &[first, second], &secret).unwrap();

        let keys = store.private_keys(KeyContext::Main);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].info.id, first_id);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let store = KeyStore::new();
        let (record, _) = wrapped_record(b"pw");

        let result = unlock_account(&store, &[record], &MailboxSecret::from("wrong"));

        assert!(result.is_err());
        assert!(store.primary_key(KeyContext::Main).is_none());
    }

    #[test]
    fn test_unlock_address_keys_skips_pending() {
        use crate::keys::{AddressId, AddressKey, LockedKeyPackage, KEY_PACKAGE_VERSION};

        let store = KeyStore::new();
        let secret = MailboxSecret::from("pw");

        let pair = KeyPair::generate();
        let activated_id = KeyId::new();
        let activated = AddressKey {
            id: activated_id,
            flags: KeyFlags::full(),
            private_key: Some(EncryptedPrivateKey::seal(&pair, &activated_id, b"pw").unwrap()),
            activation: None,
        };

        // Still wrapped under the primary key: not ours to open here
        let pending = AddressKey {
            id: KeyId::new(),
            flags: KeyFlags::full(),
            private_key: None,
            activation: Some(LockedKeyPackage {
                version: KEY_PACKAGE_VERSION,
                ephemeral_public: hex::encode([0u8; 32]),
                nonce: String::new(),
                ciphertext: String::new(),
            }),
        };

        let address = Address {
            id: AddressId::new(),
            email: "user@example.com".into(),
            keys: vec![activated, pending],
        };
        let address_id = address.id;

        unlock_address_keys(&store, &[address], &secret).unwrap();

        let keys = store.private_keys(KeyContext::Address(address_id));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].info.id, activated_id);
    }
}
