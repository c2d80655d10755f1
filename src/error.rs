//! # Error Handling
//!
//! This module provides the error types for MailVault Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Activation Errors                                                 │
//! │  │   ├── PrimaryKeyUnavailable  - Account key not unlocked             │
//! │  │   ├── KeyUnwrapFailed        - Member key could not be unwrapped    │
//! │  │   ├── ManifestBuildFailed    - Signed key list could not be built   │
//! │  │   ├── RemoteSubmissionFailed - Server rejected / transport failed   │
//! │  │   ├── KeyAlreadyActive       - Key claimed by another activation    │
//! │  │   └── StoreConsistency       - Key store invariant violated         │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed       - Encryption operation failed          │
//! │  │   ├── DecryptionFailed       - Decryption operation failed          │
//! │  │   ├── SigningFailed          - Signing operation failed             │
//! │  │   ├── VerificationFailed     - Signature verification failed        │
//! │  │   ├── InvalidKey             - Invalid key format/length            │
//! │  │   └── KeyDerivationFailed    - Failed to derive keys                │
//! │  │                                                                      │
//! │  └── Serialization Errors                                              │
//! │      ├── SerializationError    - Failed to encode a value              │
//! │      └── DeserializationError  - Failed to decode a value              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//!
//! Per-key activation failures are caught at the smallest scope (the per-key
//! step inside one address) and recorded as a terminal `Failed` state in the
//! activation report. They are never thrown across the per-address join, so
//! one bad key cannot short-circuit the rest of the batch. Only
//! `PrimaryKeyUnavailable` aborts a batch outright — see
//! [`Error::is_batch_fatal`].

use thiserror::Error;

/// Result type alias for MailVault Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MailVault Core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Activation Errors
    // ========================================================================

    /// The account's primary key is not unlocked in the key store
    #[error("Primary key unavailable. Unlock the account before activating address keys.")]
    PrimaryKeyUnavailable,

    /// A member key could not be unwrapped with the primary key
    #[error("Failed to unwrap member key: {0}")]
    KeyUnwrapFailed(String),

    /// A signed key list could not be built or signed
    #[error("Failed to build signed key list: {0}")]
    ManifestBuildFailed(String),

    /// The remote key service rejected the activation or the transport failed
    #[error("Remote key submission failed: {0}")]
    RemoteSubmissionFailed(String),

    /// The key is already being activated or has already been activated
    #[error("Key {0} is already active or being activated")]
    KeyAlreadyActive(String),

    /// A key store invariant was violated (programming-error class)
    #[error("Key store consistency violation: {0}")]
    StoreConsistency(String),

    // ========================================================================
    // Crypto Errors
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Serialization Errors
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl Error {
    /// Check if this error aborts an entire activation batch
    ///
    /// Everything except a missing primary key is local to a single key and
    /// is recorded in the activation report instead of being propagated.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Error::PrimaryKeyUnavailable)
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_fatal_classification() {
        assert!(Error::PrimaryKeyUnavailable.is_batch_fatal());
        assert!(!Error::KeyUnwrapFailed("bad material".into()).is_batch_fatal());
        assert!(!Error::ManifestBuildFailed("no signing key".into()).is_batch_fatal());
        assert!(!Error::RemoteSubmissionFailed("503".into()).is_batch_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::KeyUnwrapFailed("authentication tag mismatch".into());
        assert!(err.to_string().contains("authentication tag mismatch"));
    }
}
