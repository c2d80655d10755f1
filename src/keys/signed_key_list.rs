//! # Signed Key Lists
//!
//! A signed key list is the tamper-evident manifest describing the set of
//! keys currently valid for one address. The server distributes it to other
//! clients, which verify it before encrypting to the address.
//!
//! ## Manifest Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SIGNED KEY LIST FORMAT                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SignedKeyList                                                          │
//! │  ─────────────                                                          │
//! │  {                                                                      │
//! │    "data": "[{\"fingerprint\":\"hex...\",                               │
//! │               \"flags\":3,                                              │
//! │               \"primary\":true},...]",   // JSON array, serialized      │
//! │    "signature": "hex..."                 // Ed25519 over data bytes     │
//! │  }                                                                      │
//! │                                                                         │
//! │  • data is the exact byte string that was signed, kept serialized      │
//! │    so verification never depends on JSON re-serialization order        │
//! │  • the signature is made with the newly activated key itself           │
//! │  • create mode never references a previous manifest                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Invariant
//!
//! The manifest and the re-wrapped private key are produced in one step from
//! the same decrypted key pair. Building them from different copies would let
//! the published manifest diverge from the material the server stores.

use serde::{Deserialize, Serialize};

use crate::crypto::{sign, verify, KeyPair, Signature};
use crate::error::{Error, Result};
use crate::keys::{AddressId, EncryptedPrivateKey, KeyFlags, KeyId, StoredKey};

/// Manifest generation mode
///
/// `Create` manifests stand alone: they describe the full key set of the
/// address and supersede any previous manifest without referencing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SklMode {
    /// Build a standalone manifest (first activation and re-activation)
    Create,
}

/// One entry of a key list manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedKeyListEntry {
    /// Fingerprint of the key's public halves (hex)
    pub fingerprint: String,
    /// Capability bits (see [`KeyFlags::bits`])
    pub flags: u8,
    /// Whether this is the address's primary key
    pub primary: bool,
}

/// A signed key list manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedKeyList {
    /// Serialized JSON array of [`SignedKeyListEntry`]
    pub data: String,
    /// Ed25519 signature over `data` (hex encoded)
    pub signature: String,
}

impl SignedKeyList {
    /// Parse the manifest entries out of `data`
    pub fn entries(&self) -> Result<Vec<SignedKeyListEntry>> {
        serde_json::from_str(&self.data)
            .map_err(|e| Error::DeserializationError(format!("Invalid key list data: {}", e)))
    }
}

/// Build the signed key list and the re-wrapped private key for an address
///
/// This is one atomic build step: the manifest entries, the signature, and
/// the mailbox-wrapped ciphertext are all derived from the same decrypted
/// `pair`, so the published manifest always matches the material the server
/// ends up storing.
///
/// ## Parameters
///
/// - `address_id`: the address the manifest belongs to
/// - `pair`: the exact decrypted key pair being activated (not a recomputation)
/// - `key_id` / `flags`: identity and capabilities of that key
/// - `existing`: the address's currently stored active keys; listed ahead of
///   the new key so the manifest reflects the full key set
/// - `mode`: manifest generation mode (`Create`)
/// - `mailbox_secret`: secret the private key is re-wrapped under
///
/// ## Errors
///
/// Returns `ManifestBuildFailed` if serialization or the re-wrap fails.
/// Terminal for this key only.
pub fn build_signed_key_list(
    address_id: &AddressId,
    pair: &KeyPair,
    key_id: &KeyId,
    flags: &KeyFlags,
    existing: &[StoredKey],
    mode: SklMode,
    mailbox_secret: &[u8],
) -> Result<(SignedKeyList, EncryptedPrivateKey)> {
    // Create is the only mode; a Create manifest never reads a predecessor.
    match mode {
        SklMode::Create => {}
    }

    if !flags.signing {
        return Err(Error::ManifestBuildFailed(format!(
            "Key {} cannot sign its own key list (signing capability missing)",
            key_id
        )));
    }

    let mut entries: Vec<SignedKeyListEntry> = existing
        .iter()
        .map(|stored| SignedKeyListEntry {
            fingerprint: stored.info.fingerprint.clone(),
            flags: stored.info.flags.bits(),
            primary: false,
        })
        .collect();

    entries.push(SignedKeyListEntry {
        fingerprint: crate::crypto::key_fingerprint(
            &pair.signing.public_bytes(),
            &pair.encryption.public_bytes(),
        ),
        flags: flags.bits(),
        primary: false,
    });

    // The first stored key stays primary; a first activation promotes the
    // new key itself.
    if let Some(first) = entries.first_mut() {
        first.primary = true;
    }

    let data = serde_json::to_string(&entries)
        .map_err(|e| Error::ManifestBuildFailed(format!("Serialization failed: {}", e)))?;

    let signature = sign(&pair.signing, data.as_bytes());

    let signed_key_list = SignedKeyList {
        data,
        signature: signature.to_hex(),
    };

    let encrypted_private_key = EncryptedPrivateKey::seal(pair, key_id, mailbox_secret)
        .map_err(|e| Error::ManifestBuildFailed(format!("Re-wrap failed: {}", e)))?;

    tracing::debug!(
        "Built signed key list for address {} ({} entries)",
        address_id,
        signed_key_list.entries().map(|e| e.len()).unwrap_or(0)
    );

    Ok((signed_key_list, encrypted_private_key))
}

/// Verify a signed key list against the signer's public signing key
///
/// Checks the signature over the exact `data` bytes and returns the parsed
/// entries on success.
pub fn verify_signed_key_list(
    list: &SignedKeyList,
    signing_public: &[u8; 32],
) -> Result<Vec<SignedKeyListEntry>> {
    let signature = Signature::from_hex(&list.signature)?;
    verify(signing_public, list.data.as_bytes(), &signature)?;
    list.entries()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::keys::{extract_key_info, KeyFlags};

    fn stored(pair: KeyPair, flags: KeyFlags) -> StoredKey {
        let id = KeyId::new();
        let info = extract_key_info(&id, &pair, &flags);
        StoredKey { info, pair: Arc::new(pair) }
    }

    #[test]
    fn test_first_activation_single_primary_entry() {
        let pair = KeyPair::generate();
        let key_id = KeyId::new();

        let (list, _) = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &key_id,
            &KeyFlags::full(),
            &[],
            SklMode::Create,
            b"pw",
        )
        .unwrap();

        let entries = list.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].primary);
        assert_eq!(entries[0].flags, KeyFlags::full().bits());
    }

    #[test]
    fn test_manifest_includes_existing_keys() {
        let existing = stored(KeyPair::generate(), KeyFlags::full());
        let existing_fp = existing.info.fingerprint.clone();

        let pair = KeyPair::generate();
        let (list, _) = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &KeyId::new(),
            &KeyFlags::full(),
            &[existing],
            SklMode::Create,
            b"pw",
        )
        .unwrap();

        let entries = list.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].fingerprint, existing_fp);
        assert!(entries[0].primary);
        assert!(!entries[1].primary);
    }

    #[test]
    fn test_signature_verifies_with_new_key() {
        let pair = KeyPair::generate();

        let (list, _) = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &KeyId::new(),
            &KeyFlags::full(),
            &[],
            SklMode::Create,
            b"pw",
        )
        .unwrap();

        let entries = verify_signed_key_list(&list, &pair.signing.public_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_tampered_manifest_rejected() {
        let pair = KeyPair::generate();

        let (mut list, _) = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &KeyId::new(),
            &KeyFlags::full(),
            &[],
            SklMode::Create,
            b"pw",
        )
        .unwrap();

        list.data = list.data.replace("true", "false");

        assert!(verify_signed_key_list(&list, &pair.signing.public_bytes()).is_err());
    }

    #[test]
    fn test_manifest_and_rewrap_from_same_pair() {
        let pair = KeyPair::generate();
        let key_id = KeyId::new();

        let (list, encrypted) = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &key_id,
            &KeyFlags::full(),
            &[],
            SklMode::Create,
            b"pw",
        )
        .unwrap();

        // The re-wrapped material opens back to the pair whose fingerprint
        // the manifest lists
        let reopened = encrypted.open(&key_id, b"pw").unwrap();
        let fingerprint = crate::crypto::key_fingerprint(
            &reopened.signing.public_bytes(),
            &reopened.encryption.public_bytes(),
        );

        let entries = list.entries().unwrap();
        assert_eq!(entries[0].fingerprint, fingerprint);
    }

    #[test]
    fn test_non_signing_key_rejected() {
        let pair = KeyPair::generate();
        let flags = KeyFlags { signing: false, encryption: true };

        let result = build_signed_key_list(
            &AddressId::new(),
            &pair,
            &KeyId::new(),
            &flags,
            &[],
            SklMode::Create,
            b"pw",
        );

        assert!(matches!(result, Err(Error::ManifestBuildFailed(_))));
    }
}
