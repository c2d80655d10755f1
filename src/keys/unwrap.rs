//! # Member Key Wrapping
//!
//! Wraps and unwraps dependent (member) address keys under the account's
//! primary key.
//!
//! ## Scheme
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     MEMBER KEY WRAP / UNWRAP                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  WRAP (provisioning side)                                              │
//! │                                                                         │
//! │  1. ephemeral = X25519::generate()                                     │
//! │  2. shared    = ephemeral_secret × primary_public                      │
//! │  3. wrap_key  = HKDF(shared, salt = key_id)                            │
//! │  4. package   = AES-GCM(wrap_key, secret halves, aad = key_id)         │
//! │     + ephemeral_public shipped alongside                               │
//! │                                                                         │
//! │  UNWRAP (activation side)                                              │
//! │                                                                         │
//! │  1. shared    = primary_secret × ephemeral_public                      │
//! │  2. wrap_key  = HKDF(shared, salt = key_id)                            │
//! │  3. material  = AES-GCM-open(wrap_key, package, aad = key_id)          │
//! │                                                                         │
//! │  The wrap side never needs a long-lived sender identity: the           │
//! │  ephemeral secret is dropped right after the DH, so only the           │
//! │  primary key holder can recover the material.                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::crypto::{self, EncryptionKeyPair, KeyPair, SharedSecret};
use crate::error::{Error, Result};
use crate::keys::{KeyId, LockedKeyPackage, KEY_PACKAGE_VERSION};

/// Wrap a member key under the primary key's encryption half
///
/// Produces the activation package shipped with a freshly provisioned
/// address key. Only the primary key holder can unwrap it.
pub fn wrap_member_key(
    member: &KeyPair,
    primary_public_encryption: &[u8; 32],
    key_id: &KeyId,
) -> Result<LockedKeyPackage> {
    let ephemeral = EncryptionKeyPair::generate();

    let dh_output = ephemeral.diffie_hellman(primary_public_encryption);
    let shared_secret = SharedSecret::from_bytes(dh_output);
    let wrap_key = shared_secret.derive_key(key_id.as_aad())?;

    let secret = member.secret_bytes();
    let (nonce, ciphertext) = crypto::encrypt(&wrap_key, secret.as_ref(), key_id.as_aad())?;

    Ok(LockedKeyPackage {
        version: KEY_PACKAGE_VERSION,
        ephemeral_public: hex::encode(ephemeral.public_bytes()),
        nonce: BASE64.encode(nonce.as_bytes()),
        ciphertext: BASE64.encode(&ciphertext),
    })
}

/// Unwrap a member key package with the decrypted primary key
///
/// ## Input Constraints
///
/// - `primary` must be the account's decrypted primary key pair
/// - `package` must be the member key's locked activation package
///
/// ## Errors
///
/// Returns `KeyUnwrapFailed` when the primary key cannot decrypt the package
/// (wrong key material, corruption, wrong key id). The failure is specific to
/// this one key; callers must not let it abort sibling keys or addresses.
pub fn decrypt_member_key(
    package: &LockedKeyPackage,
    primary: &KeyPair,
    key_id: &KeyId,
) -> Result<KeyPair> {
    if package.version != KEY_PACKAGE_VERSION {
        return Err(Error::KeyUnwrapFailed(format!(
            "Unsupported package version: {} (expected {})",
            package.version, KEY_PACKAGE_VERSION
        )));
    }

    let ephemeral_public = package.ephemeral_public_bytes()?;
    let nonce = package.nonce()?;
    let ciphertext = package.ciphertext_bytes()?;

    let dh_output = primary.encryption.diffie_hellman(&ephemeral_public);
    let shared_secret = SharedSecret::from_bytes(dh_output);
    let wrap_key = shared_secret.derive_key(key_id.as_aad())?;

    let secret = crypto::decrypt(&wrap_key, &nonce, &ciphertext, key_id.as_aad())
        .map_err(|e| Error::KeyUnwrapFailed(e.to_string()))?;

    KeyPair::from_secret_bytes(&secret)
}

// ============================================================================
// TESTS
// ============================================================================
