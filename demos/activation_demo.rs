//! # Key Activation Demo
//!
//! Demonstrates the full address-key activation pipeline: unlocking the
//! account's primary key, then promoting wrapped member keys into usable,
//! server-registered keys.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example activation_demo
//! ```

use std::sync::Arc;

use mailvault_core::keys::{
    unlock_account, wrap_member_key, AccountKeys, EncryptedPrivateKey,
};
use mailvault_core::{
    ActivationService, Address, AddressId, AddressKey, InMemoryKeyService, KeyContext, KeyFlags,
    KeyId, KeyPair, KeyStore, MailboxSecret,
};

#[tokio::main]
async fn main() {
    println!("=== MailVault Core: Key Activation Demo ===\n");

    let mailbox_secret = MailboxSecret::from("correct horse battery staple");

    // Step 1: Unlock the account's primary key
    println!("Step 1: Unlocking the account's primary key...");

    let primary = KeyPair::generate();
    let primary_public = primary.public_keys();
    let primary_id = KeyId::new();
    let wrapped_primary = EncryptedPrivateKey::seal(
        &primary,
        &primary_id,
        b"correct horse battery staple",
    )
    .expect("Failed to wrap primary key");

    let store = Arc::new(KeyStore::new());
    unlock_account(
        &store,
        &[AccountKeys {
            id: primary_id,
            flags: KeyFlags::full(),
            private_key: wrapped_primary,
        }],
        &mailbox_secret,
    )
    .expect("Failed to unlock account");

    println!("  Primary key unlocked into the main context");
    println!(
        "  Fingerprint: {}",
        store
            .primary_key(KeyContext::Main)
            .expect("primary key missing")
            .info
            .fingerprint
    );
    println!();

    // Step 2: Provision two address keys wrapped under the primary key
    println!("Step 2: Provisioning pending address keys...");

    let mut addresses = Vec::new();
    for email in ["alice@example.com", "billing@example.com"] {
        let key_id = KeyId::new();
        let member = KeyPair::generate();
        let package = wrap_member_key(&member, &primary_public.encryption, &key_id)
            .expect("Failed to wrap member key");

        addresses.push(Address {
            id: AddressId::new(),
            email: email.to_string(),
            keys: vec![AddressKey {
                id: key_id,
                flags: KeyFlags::full(),
                private_key: None,
                activation: Some(package),
            }],
        });

        println!("  {} -> key {} (pending activation)", email, key_id);
    }
    println!();

    // Step 3: Run the activation pipeline
    println!("Step 3: Activating...");
    println!();
    println!("  ┌─────────────────────────────────────────────────────────────┐");
    println!("  │                   ACTIVATION PIPELINE                       │");
    println!("  ├─────────────────────────────────────────────────────────────┤");
    println!("  │                                                             │");
    println!("  │  per address (concurrent):                                 │");
    println!("  │    per key (sequential):                                   │");
    println!("  │      unwrap with primary key                               │");
    println!("  │      build signed key list + re-wrap under mailbox secret  │");
    println!("  │      submit to the remote key service                      │");
    println!("  │      append the decrypted record to the key store          │");
    println!("  │                                                             │");
    println!("  └─────────────────────────────────────────────────────────────┘");
    println!();

    let remote = Arc::new(InMemoryKeyService::new());
    let service = ActivationService::new(Arc::clone(&store), Arc::clone(&remote));

    let report = service
        .activate(&addresses, &mailbox_secret)
        .await
        .expect("Activation batch failed");

    println!(
        "  Report: {} activated, {} failed",
        report.activated_count(),
        report.failed_count()
    );
    println!("  Remote registry now holds {} key(s)", remote.activated_count());
    println!();

    // Step 4: Inspect the results
    println!("Step 4: Inspecting activated keys...");

    for address in &addresses {
        let keys = store.private_keys(KeyContext::Address(address.id));
        for stored in &keys {
            println!("  {}:", address.email);
            println!("    fingerprint: {}", stored.info.fingerprint);
            println!("    decrypted:   {}", stored.info.decrypted);

            let payload = remote
                .payload_for(&stored.info.id)
                .expect("payload missing from remote registry");
            println!("    manifest:    {}", payload.signed_key_list.data);
        }
    }
    println!();

    println!("=== Demo complete ===");
}
