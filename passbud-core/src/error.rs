use thiserror::Error;

use crate::crypto::{CryptoPurpose, KeystoreError, ValidationResult};
use crate::repository::RepositoryError;

/// Result type for vault, engine and session operations.
pub type VaultResult<T, E = VaultError> = std::result::Result<T, E>;

/// Error outputs from PassBud.
///
/// Validation-class variants (`KeyInitFail`, `KeyPermanentlyInvalidated`) are
/// normally absorbed by the vault's wipe policy and only reach callers as a
/// status; the remaining variants are meant to be shown to the user.
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum VaultError {
    /// No key exists under the configured alias.
    #[error("key_unavailable")]
    KeyUnavailable,
    /// The key exists but refused to run without a completed authentication;
    /// retrying after the ceremony may help.
    #[error("validation_failed")]
    ValidationFailed,
    /// A security-relevant device change invalidated the key.
    #[error("key_permanently_invalidated")]
    KeyPermanentlyInvalidated,
    /// The keystore backend is unusable.
    #[error("key_init_fail")]
    KeyInitFail,
    /// An encrypted credential was saved without a completed authentication.
    #[error("missing_crypto_object: authenticate before saving an encrypted credential")]
    MissingCryptoObject,
    /// The crypto layer did not validate right before an operation.
    #[error("invalid_crypto_layer: {status}")]
    InvalidCryptoLayer {
        /// Outcome of the validation that failed.
        status: ValidationResult,
    },
    /// Ciphertext, IV and key do not match (tampering, wrong IV, rotated key).
    #[error("decryption_failed: {0}")]
    DecryptionFailed(String),
    /// The keystore refused to encrypt.
    #[error("encryption_failed: {0}")]
    EncryptionFailed(String),
    /// A stored bank card string is malformed.
    #[error("parse_error: {0}")]
    ParseError(String),
    /// A stored value is not valid base64.
    #[error("invalid_encoding: {0}")]
    InvalidEncoding(String),
    /// The handle was created for the other crypto purpose.
    #[error("purpose_mismatch: expected {expected}, found {found}")]
    PurposeMismatch {
        /// Purpose the operation needs.
        expected: CryptoPurpose,
        /// Purpose the handle was created with.
        found: CryptoPurpose,
    },
    /// The handle already performed its single operation.
    #[error("handle_consumed")]
    HandleConsumed,
    /// The crypto object does not belong to the pending intent.
    #[error("stale_crypto_object: authentication result does not match the pending request")]
    StaleCryptoObject,
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input '{parameter}': {reason}")]
    InvalidInput {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of the issue.
        reason: String,
    },
    /// A referenced record does not exist.
    #[error("not_found: {0}")]
    NotFound(String),
    /// Unexpected keystore failure.
    #[error("keystore_error: {0}")]
    Keystore(String),
    /// Persistence collaborator failure.
    #[error("repository_error: {0}")]
    Repository(String),
}

impl VaultError {
    /// Creates an invalid input error.
    pub fn invalid_input<P: Into<String>, R: Into<String>>(parameter: P, reason: R) -> Self {
        Self::InvalidInput {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the outcomes that trigger the wipe policy.
    #[must_use]
    pub const fn is_key_loss(&self) -> bool {
        matches!(self, Self::KeyInitFail | Self::KeyPermanentlyInvalidated)
    }
}

impl From<RepositoryError> for VaultError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            other => Self::Repository(other.to_string()),
        }
    }
}

impl From<KeystoreError> for VaultError {
    fn from(error: KeystoreError) -> Self {
        match error {
            KeystoreError::KeyNotFound(_) => Self::KeyUnavailable,
            KeystoreError::KeyPermanentlyInvalidated(_) => Self::KeyPermanentlyInvalidated,
            KeystoreError::Unavailable(_) => Self::KeyInitFail,
            KeystoreError::UserNotAuthenticated => Self::ValidationFailed,
            KeystoreError::AuthenticationFailed(message) | KeystoreError::InvalidIv(message) => {
                Self::DecryptionFailed(message)
            }
            KeystoreError::CipherConsumed => Self::HandleConsumed,
            other => Self::Keystore(other.to_string()),
        }
    }
}
