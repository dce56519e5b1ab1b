//! Platform keystore traits for hardware-backed encryption.
//!
//! The engine never sees key material. It asks the platform to initialise a
//! cipher against a named key and hands the resulting [`CipherContext`] to
//! the biometric ceremony, mirroring how `javax.crypto.Cipher` objects travel
//! through `BiometricPrompt.CryptoObject` on Android.

use std::sync::Arc;

use strum::Display;
use thiserror::Error;

/// Result type for keystore operations.
pub type KeystoreResult<T> = Result<T, KeystoreError>;

/// Errors raised by a [`HardwareKeystore`] or [`CipherContext`].
///
/// Implementations must report the first three variants precisely: the
/// engine's validation outcome is derived from them.
#[derive(Debug, Error, uniffi::Error)]
pub enum KeystoreError {
    /// No key is stored under the alias.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key was invalidated by a security-relevant device change
    /// (for example a new biometric enrollment).
    #[error("key permanently invalidated: {0}")]
    KeyPermanentlyInvalidated(String),

    /// The keystore backend cannot be used at all.
    #[error("keystore unavailable: {0}")]
    Unavailable(String),

    /// The key requires user authentication that has not happened.
    #[error("user not authenticated")]
    UserNotAuthenticated,

    /// AEAD tag verification failed (tampered data, wrong IV, rotated key).
    #[error("authentication tag mismatch: {0}")]
    AuthenticationFailed(String),

    /// The cipher context already finished its operation.
    #[error("cipher context already used")]
    CipherConsumed,

    /// The IV has the wrong length for the cipher.
    #[error("invalid iv: {0}")]
    InvalidIv(String),

    /// Any other keystore failure.
    #[error("keystore failure: {0}")]
    Failure(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KeystoreError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Direction a cipher context is initialised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum CipherMode {
    /// Encrypt; the platform generates the IV.
    Encrypt,
    /// Decrypt with a caller-supplied IV.
    Decrypt,
}

/// Authenticator class a key is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum AuthenticatorClass {
    /// Class 3 biometrics (Android `BIOMETRIC_STRONG`).
    BiometricStrong,
    /// Class 2 biometrics (Android `BIOMETRIC_WEAK`).
    BiometricWeak,
    /// PIN, pattern or password.
    DeviceCredential,
}

/// Parameters of the key requested from the platform.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeySpec {
    /// Alias the key is stored under.
    pub alias: String,
    /// Key size in bits.
    pub key_size_bits: u32,
    /// Whether every use of the key requires user authentication.
    pub user_authentication_required: bool,
    /// Authenticator class allowed to unlock the key.
    pub authenticator: AuthenticatorClass,
    /// Whether a new biometric enrollment invalidates the key.
    pub invalidated_by_biometric_enrollment: bool,
}

impl KeySpec {
    /// The spec used for credential encryption keys: 256 bits, strong
    /// biometrics for every use, invalidated on new enrollment.
    #[must_use]
    pub fn biometric_bound(alias: impl Into<String>, key_size_bits: u32) -> Self {
        Self {
            alias: alias.into(),
            key_size_bits,
            user_authentication_required: true,
            authenticator: AuthenticatorClass::BiometricStrong,
            invalidated_by_biometric_enrollment: true,
        }
    }
}

/// Hardware-backed symmetric key storage.
///
/// Platform implementations should use:
/// - Android: `AndroidKeyStore` with an AES-GCM key built by
///   `KeyGenParameterSpec` (`setUserAuthenticationRequired(true)`,
///   `setInvalidatedByBiometricEnrollment(true)`)
/// - iOS: Secure Enclave with a `.biometryCurrentSet` access control
///
/// # Security Requirements
///
/// - Key material MUST NOT leave the platform keystore.
/// - Ciphers MUST use authenticated encryption.
/// - Initialising a cipher against an invalidated key MUST fail with
///   [`KeystoreError::KeyPermanentlyInvalidated`].
#[uniffi::export(with_foreign)]
pub trait HardwareKeystore: Send + Sync {
    /// Returns whether a key exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be queried.
    fn contains_key(&self, alias: String) -> KeystoreResult<bool>;

    /// Creates a key described by `spec`, replacing nothing: callers delete
    /// any previous key first.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses to create the key.
    fn generate_key(&self, spec: KeySpec) -> KeystoreResult<()>;

    /// Deletes the key under `alias`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be modified.
    fn delete_key(&self, alias: String) -> KeystoreResult<()>;

    /// Initialises a cipher against the key under `alias`.
    ///
    /// For [`CipherMode::Encrypt`] `iv` is `None` and the platform picks a
    /// fresh IV. For [`CipherMode::Decrypt`] `iv` is the IV recorded at
    /// encryption time.
    ///
    /// # Errors
    ///
    /// - [`KeystoreError::KeyNotFound`] when the alias is empty
    /// - [`KeystoreError::KeyPermanentlyInvalidated`] after an enrollment change
    /// - [`KeystoreError::Unavailable`] when the backend is unusable
    fn init_cipher(
        &self,
        alias: String,
        mode: CipherMode,
        iv: Option<Vec<u8>>,
    ) -> KeystoreResult<Arc<dyn CipherContext>>;
}

/// An initialised cipher, unusable until the user authenticates.
#[uniffi::export(with_foreign)]
pub trait CipherContext: Send + Sync {
    /// The IV this context uses. For encryption this is the IV that must be
    /// persisted next to the ciphertext.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot report the IV.
    fn iv(&self) -> KeystoreResult<Vec<u8>>;

    /// Runs the whole operation over `input` and returns the output
    /// (ciphertext with tag, or plaintext).
    ///
    /// # Errors
    ///
    /// - [`KeystoreError::UserNotAuthenticated`] before a successful ceremony
    /// - [`KeystoreError::AuthenticationFailed`] when tag verification fails
    /// - [`KeystoreError::CipherConsumed`] on a second call
    fn do_final(&self, input: Vec<u8>) -> KeystoreResult<Vec<u8>>;
}
