//! The keyed crypto engine: one named key, validated on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use strum::Display;
use zeroize::Zeroizing;

use super::handle::{AuthenticatedHandle, CryptoObject, CryptoPurpose};
use super::keystore::{CipherMode, HardwareKeystore, KeySpec, KeystoreError};
use crate::error::{VaultError, VaultResult};

/// Outcome of checking the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum ValidationResult {
    /// A cipher can be initialised against the key.
    Ok,
    /// The key is missing or the keystore backend is unusable.
    KeyInitFail,
    /// The key exists but initialising a cipher failed for another reason.
    ValidationFailed,
    /// A security-relevant device change invalidated the key.
    KeyPermanentlyInvalidated,
}

impl ValidationResult {
    /// Whether the outcome means every stored ciphertext is lost.
    #[must_use]
    pub const fn requires_wipe(self) -> bool {
        matches!(self, Self::KeyInitFail | Self::KeyPermanentlyInvalidated)
    }

    fn from_init(init: Result<(), KeystoreError>) -> Self {
        match init {
            Ok(()) => Self::Ok,
            Err(KeystoreError::KeyNotFound(_) | KeystoreError::Unavailable(_)) => Self::KeyInitFail,
            Err(KeystoreError::KeyPermanentlyInvalidated(_)) => Self::KeyPermanentlyInvalidated,
            Err(_) => Self::ValidationFailed,
        }
    }
}

/// Lifecycle state of the key as observed through the keystore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum KeyState {
    /// No key under the alias.
    Absent,
    /// The key cannot be initialised right now.
    InitFailing,
    /// Usable.
    Valid,
    /// Invalidated by an enrollment change; only regeneration helps.
    Invalidated,
}

/// Ciphertext together with the IV the platform chose for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// IV that must be persisted next to the ciphertext.
    pub iv: Vec<u8>,
}

/// Owns the single hardware-backed key used for credential encryption.
pub struct KeyedCryptoEngine {
    keystore: Arc<dyn HardwareKeystore>,
    spec: KeySpec,
    next_session: AtomicU64,
}

impl KeyedCryptoEngine {
    /// Creates an engine for the key described by `spec`. No keystore call
    /// is made until the first operation.
    #[must_use]
    pub fn new(keystore: Arc<dyn HardwareKeystore>, spec: KeySpec) -> Self {
        Self {
            keystore,
            spec,
            next_session: AtomicU64::new(1),
        }
    }

    /// The alias of the managed key.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.spec.alias
    }

    /// Checks the key by initialising an encrypt cipher without running it.
    ///
    /// No data is encrypted and nothing is persisted.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let init = self
            .keystore
            .init_cipher(self.spec.alias.clone(), CipherMode::Encrypt, None)
            .map(|_| ());
        let result = ValidationResult::from_init(init);
        if result != ValidationResult::Ok {
            log::warn!("key '{}' failed validation: {result}", self.spec.alias);
        }
        result
    }

    /// Replaces the key with a fresh one and validates it.
    ///
    /// Every ciphertext produced under the previous key becomes undecryptable.
    #[must_use]
    pub fn generate_key_with_result(&self) -> ValidationResult {
        let generated = self
            .keystore
            .delete_key(self.spec.alias.clone())
            .and_then(|()| self.keystore.generate_key(self.spec.clone()));
        if let Err(err) = generated {
            log::error!("failed to generate key '{}': {err}", self.spec.alias);
            return ValidationResult::from_init(Err(err));
        }
        log::info!("generated key '{}'", self.spec.alias);
        self.validate()
    }

    /// Generates the key if none exists yet, then validates.
    ///
    /// This is the fresh-install path; an existing key is never replaced.
    #[must_use]
    pub fn ensure_key(&self) -> ValidationResult {
        match self.keystore.contains_key(self.spec.alias.clone()) {
            Ok(true) => self.validate(),
            Ok(false) => self.generate_key_with_result(),
            Err(err) => {
                log::error!("keystore lookup failed: {err}");
                ValidationResult::KeyInitFail
            }
        }
    }

    /// Deletes the key material. Stored rows are left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore refuses the deletion.
    pub fn clear(&self) -> VaultResult<()> {
        self.keystore.delete_key(self.spec.alias.clone())?;
        log::info!("cleared key '{}'", self.spec.alias);
        Ok(())
    }

    /// Reports the key's lifecycle state.
    #[must_use]
    pub fn key_state(&self) -> KeyState {
        match self.keystore.contains_key(self.spec.alias.clone()) {
            Ok(false) => KeyState::Absent,
            Err(_) => KeyState::InitFailing,
            Ok(true) => match self.validate() {
                ValidationResult::Ok => KeyState::Valid,
                ValidationResult::KeyInitFail | ValidationResult::ValidationFailed => {
                    KeyState::InitFailing
                }
                ValidationResult::KeyPermanentlyInvalidated => KeyState::Invalidated,
            },
        }
    }

    /// Creates the crypto object a biometric ceremony authenticates.
    ///
    /// `iv` is ignored for encryption and required for decryption, where it
    /// must be the exact IV recorded when the value was encrypted.
    ///
    /// # Errors
    ///
    /// - [`VaultError::KeyUnavailable`] if no key exists
    /// - [`VaultError::InvalidInput`] if a decryption IV is missing
    /// - the mapped keystore error otherwise
    pub fn create_auth_session(
        &self,
        purpose: CryptoPurpose,
        iv: Option<&[u8]>,
    ) -> VaultResult<Arc<CryptoObject>> {
        let iv = match purpose {
            CryptoPurpose::Encryption => None,
            CryptoPurpose::Decryption => Some(
                iv.ok_or_else(|| VaultError::invalid_input("iv", "required for decryption"))?
                    .to_vec(),
            ),
        };
        let cipher = self
            .keystore
            .init_cipher(self.spec.alias.clone(), purpose.cipher_mode(), iv)?;
        let session_id = self.next_session.fetch_add(1, Ordering::SeqCst);
        log::debug!("created {purpose} crypto object #{session_id}");
        Ok(Arc::new(CryptoObject::new(session_id, purpose, cipher)))
    }

    /// Encrypts `plaintext` with an authenticated encryption handle.
    ///
    /// # Errors
    ///
    /// - [`VaultError::PurposeMismatch`] for a decryption handle
    /// - [`VaultError::HandleConsumed`] if the handle was already used
    /// - [`VaultError::EncryptionFailed`] if the keystore refuses
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        handle: AuthenticatedHandle,
    ) -> VaultResult<EncryptedData> {
        handle.require(CryptoPurpose::Encryption)?;
        let cipher = handle.crypto_object().claim()?;
        let iv = cipher
            .iv()
            .map_err(|err| VaultError::EncryptionFailed(err.to_string()))?;
        let ciphertext = cipher.do_final(plaintext.to_vec()).map_err(|err| match err {
            KeystoreError::CipherConsumed => VaultError::HandleConsumed,
            other => VaultError::EncryptionFailed(other.to_string()),
        })?;
        Ok(EncryptedData { ciphertext, iv })
    }

    /// Decrypts `ciphertext` with an authenticated decryption handle.
    ///
    /// # Errors
    ///
    /// - [`VaultError::PurposeMismatch`] for an encryption handle
    /// - [`VaultError::HandleConsumed`] if the handle was already used
    /// - [`VaultError::DecryptionFailed`] on tampering, a wrong IV or a
    ///   rotated key
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        handle: AuthenticatedHandle,
    ) -> VaultResult<Zeroizing<Vec<u8>>> {
        handle.require(CryptoPurpose::Decryption)?;
        let cipher = handle.crypto_object().claim()?;
        cipher
            .do_final(ciphertext.to_vec())
            .map(Zeroizing::new)
            .map_err(|err| match err {
                KeystoreError::CipherConsumed => VaultError::HandleConsumed,
                other => VaultError::DecryptionFailed(other.to_string()),
            })
    }
}
