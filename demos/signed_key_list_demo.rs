//! # Signed Key List Demo
//!
//! Demonstrates building and verifying the tamper-evident manifest that
//! declares which keys are valid for an address.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example signed_key_list_demo
//! ```

use mailvault_core::keys::{build_signed_key_list, verify_signed_key_list, SklMode};
use mailvault_core::{AddressId, KeyFlags, KeyId, KeyPair};

fn main() {
    println!("=== MailVault Core: Signed Key List Demo ===\n");

    // Step 1: Create the key being activated
    println!("Step 1: Creating an address key...");

    let pair = KeyPair::generate();
    let key_id = KeyId::new();
    let address_id = AddressId::new();

    println!("  Key id: {}", key_id);
    println!();

    // Step 2: Build the manifest and the re-wrapped private key in one step
    println!("Step 2: Building the signed key list...");

    let (list, encrypted) = build_signed_key_list(
        &address_id,
        &pair,
        &key_id,
        &KeyFlags::full(),
        &[],
        SklMode::Create,
        b"mailbox secret",
    )
    .expect("Failed to build signed key list");

    println!("  data:      {}", list.data);
    println!("  signature: {}", list.signature);
    println!();
    println!("  The same build step re-wrapped the private key under the");
    println!("  mailbox secret (salt {}), so manifest and", encrypted.salt);
    println!("  ciphertext can never drift apart.");
    println!();

    // Step 3: Verify as a peer would
    println!("Step 3: Verifying the manifest...");

    let public = pair.public_keys();
    match verify_signed_key_list(&list, &public.signing) {
        Ok(entries) => println!("  [OK] Manifest valid, {} entry(ies)", entries.len()),
        Err(_) => println!("  [FAILED] Manifest verification failed!"),
    }
    println!();

    // Step 4: Demonstrate tamper detection
    println!("Step 4: Tampering with the manifest...");

    let mut tampered = list.clone();
    tampered.data = tampered.data.replace("\"primary\":true", "\"primary\":false");

    match verify_signed_key_list(&tampered, &public.signing) {
        Ok(_) => println!("  [UNEXPECTED] Tampered manifest accepted!"),
        Err(_) => println!("  [OK] Tampered manifest rejected"),
    }
    println!();

    println!("=== Demo complete ===");
}
