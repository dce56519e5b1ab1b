//! The repository-facing orchestrator.
//!
//! [`CredentialVault`] combines the crypto engine, the storage codec and a
//! [`CredentialRepository`]. It owns the self-healing policy: whenever key
//! validation reports [`ValidationResult::KeyInitFail`] or
//! [`ValidationResult::KeyPermanentlyInvalidated`], the key and every
//! account and credential are wiped before anything else happens.

mod biometric;
mod config;
mod feed;

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;
use zeroize::Zeroizing;

pub use biometric::{
    AppStatus, AuthenticatorAvailability, BiometricAuthStatus, BiometricCapability,
    BiometricInfo, KeyStatus,
};
pub use config::{VaultConfig, DEFAULT_KEY_ALIAS, DEFAULT_KEY_SIZE_BITS};
pub use feed::{ChangeFeed, ChangeListener, Subscription};

use crate::codec::{self, encode_for_storage};
use crate::crypto::{
    Authentication, AuthenticatedHandle, CryptoObject, CryptoPurpose, HardwareKeystore,
    KeyedCryptoEngine, ValidationResult,
};
use crate::error::{VaultError, VaultResult};
use crate::repository::{Account, AccountWithCounts, Credential, CredentialRepository};

/// Credential storage with biometric-bound encryption.
pub struct CredentialVault {
    engine: KeyedCryptoEngine,
    repository: Arc<dyn CredentialRepository>,
    biometrics: Arc<dyn BiometricCapability>,
    feed: ChangeFeed,
    /// Serializes key repair so one loss triggers one wipe.
    key_repair: Mutex<()>,
}

impl CredentialVault {
    /// Creates a vault. The keystore is not touched until the first call.
    #[must_use]
    pub fn new(
        config: &VaultConfig,
        keystore: Arc<dyn HardwareKeystore>,
        repository: Arc<dyn CredentialRepository>,
        biometrics: Arc<dyn BiometricCapability>,
    ) -> Self {
        Self {
            engine: KeyedCryptoEngine::new(keystore, config.key_spec()),
            repository,
            biometrics,
            feed: ChangeFeed::new(),
            key_repair: Mutex::new(()),
        }
    }

    /// The engine managing the encryption key.
    #[must_use]
    pub const fn engine(&self) -> &KeyedCryptoEngine {
        &self.engine
    }

    /// The feed bumped by every mutation.
    #[must_use]
    pub const fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Reads biometric availability and brings the key into a usable state.
    ///
    /// A missing key is generated. An invalidated key wipes all data, is
    /// regenerated, and is reported as [`KeyStatus::Invalidated`] so the UI
    /// can tell the user their data was reset.
    ///
    /// # Errors
    ///
    /// Returns an error only if the wipe itself fails.
    pub async fn biometric_info(&self) -> VaultResult<BiometricInfo> {
        let biometric_auth_status = self.biometrics.can_authenticate().into();
        let repair = self.key_repair.lock().await;
        let validation = self.engine.ensure_key();
        let regenerated = self.apply_wipe_policy(validation).await?;
        drop(repair);
        let key_status = match (validation, regenerated) {
            (ValidationResult::Ok, _) => KeyStatus::Ready,
            (ValidationResult::KeyPermanentlyInvalidated, Some(ValidationResult::Ok)) => {
                KeyStatus::Invalidated
            }
            _ => KeyStatus::NotReady,
        };
        log::info!("biometrics {biometric_auth_status}, key {key_status}");
        Ok(BiometricInfo {
            biometric_auth_status,
            key_status,
        })
    }

    /// Validates the key, wiping everything if it was lost.
    ///
    /// The returned outcome is the one observed before any regeneration, so
    /// a caller holding a crypto object for the old key still learns that it
    /// is useless. Concurrent callers that find the same loss wait for the
    /// first repair and then see the repaired key.
    ///
    /// # Errors
    ///
    /// Returns an error only if the wipe itself fails.
    pub async fn check_crypto_layer(&self) -> VaultResult<ValidationResult> {
        let validation = self.engine.validate();
        if !validation.requires_wipe() {
            return Ok(validation);
        }
        let repair = self.key_repair.lock().await;
        // Another caller may have repaired the key while this one waited.
        let validation = self.engine.validate();
        self.apply_wipe_policy(validation).await?;
        drop(repair);
        Ok(validation)
    }

    async fn validate_crypto_layer(&self) -> VaultResult<()> {
        match self.check_crypto_layer().await? {
            ValidationResult::Ok => Ok(()),
            status => Err(VaultError::InvalidCryptoLayer { status }),
        }
    }

    /// Wipes on key loss and regenerates an invalidated key. Returns the
    /// regeneration outcome when one was attempted.
    async fn apply_wipe_policy(
        &self,
        validation: ValidationResult,
    ) -> VaultResult<Option<ValidationResult>> {
        if !validation.requires_wipe() {
            return Ok(None);
        }
        log::warn!("key unusable ({validation}); wiping key and all stored data");
        self.wipe().await?;
        if validation != ValidationResult::KeyPermanentlyInvalidated {
            return Ok(None);
        }
        let regenerated = self.engine.generate_key_with_result();
        log::info!("regenerated key after invalidation: {regenerated}");
        Ok(Some(regenerated))
    }

    async fn wipe(&self) -> VaultResult<()> {
        if let Err(err) = self.engine.clear() {
            log::warn!("failed to clear key during wipe: {err}");
        }
        self.repository.delete_all_credentials().await?;
        self.repository.delete_all_accounts().await?;
        self.feed.notify();
        Ok(())
    }

    /// Creates the crypto object a biometric ceremony must authenticate.
    ///
    /// For decryption `iv` is the base64 IV stored with the credential.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidCryptoLayer`] if the key does not validate
    /// - [`VaultError::InvalidInput`] if a decryption IV is missing
    /// - [`VaultError::InvalidEncoding`] if the IV is not base64
    /// - [`VaultError::DecryptionFailed`] if the IV has the wrong length
    pub async fn create_crypto_object(
        &self,
        purpose: CryptoPurpose,
        iv: Option<&str>,
    ) -> VaultResult<Arc<CryptoObject>> {
        self.validate_crypto_layer().await?;
        let iv = match purpose {
            CryptoPurpose::Encryption => None,
            CryptoPurpose::Decryption => {
                let encoded =
                    iv.ok_or_else(|| VaultError::invalid_input("iv", "required for decryption"))?;
                Some(codec::decode_field("iv", encoded)?)
            }
        };
        self.engine.create_auth_session(purpose, iv.as_deref())
    }

    /// Stores a credential, encrypting it first when `is_encrypted` is set.
    ///
    /// A blank `credential_id` is replaced by a fresh UUID. Plaintext
    /// credentials ignore `authentication`. Returns the record as stored.
    ///
    /// # Errors
    ///
    /// - [`VaultError::MissingCryptoObject`] for an encrypted credential
    ///   without authentication; nothing is written
    /// - [`VaultError::InvalidCryptoLayer`] if the key does not validate
    /// - engine and repository errors otherwise
    pub async fn save_credential(
        &self,
        mut credential: Credential,
        authentication: Authentication,
    ) -> VaultResult<Credential> {
        let handle = authentication.into_handle();
        if credential.is_encrypted && handle.is_none() {
            return Err(VaultError::MissingCryptoObject);
        }
        if credential.credential_id.trim().is_empty() {
            credential.credential_id = Uuid::new_v4().to_string();
        }

        match handle {
            Some(handle) if credential.is_encrypted => {
                self.validate_crypto_layer().await?;
                let plaintext = Zeroizing::new(std::mem::take(&mut credential.value));
                let sealed = self.engine.encrypt(plaintext.as_bytes(), handle)?;
                let stored = encode_for_storage(&sealed.ciphertext, &sealed.iv);
                credential.value = stored.value;
                credential.encryption_iv = Some(stored.iv);
            }
            _ => credential.encryption_iv = None,
        }

        self.repository.upsert_credential(credential.clone()).await?;
        log::debug!(
            "saved credential {} (encrypted: {})",
            credential.credential_id,
            credential.is_encrypted
        );
        self.feed.notify();
        Ok(credential)
    }

    /// Decrypts a stored base64 value. Never writes.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidCryptoLayer`] if the key does not validate
    /// - [`VaultError::InvalidEncoding`] if `value` is not base64
    /// - [`VaultError::DecryptionFailed`] if the ciphertext does not open or
    ///   is not UTF-8
    pub async fn decrypt_credential(
        &self,
        value: &str,
        handle: AuthenticatedHandle,
    ) -> VaultResult<Zeroizing<String>> {
        self.validate_crypto_layer().await?;
        let ciphertext = codec::decode_field("value", value)?;
        let plaintext = self.engine.decrypt(&ciphertext, handle)?;
        std::str::from_utf8(&plaintext)
            .map(|text| Zeroizing::new(text.to_string()))
            .map_err(|_| VaultError::DecryptionFailed("plaintext is not utf-8".to_string()))
    }

    /// Creates an account and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn create_account(&self, name: &str, description: &str) -> VaultResult<String> {
        let account_id = Uuid::new_v4().to_string();
        self.repository
            .create_account(Account {
                account_id: account_id.clone(),
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        self.feed.notify();
        Ok(account_id)
    }

    /// Replaces name and description of an existing account.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] if the account does not exist.
    pub async fn update_account_details(&self, account: Account) -> VaultResult<()> {
        self.repository.update_account(account).await?;
        self.feed.notify();
        Ok(())
    }

    /// Deletes an account together with its credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete_account(&self, account_id: &str) -> VaultResult<()> {
        self.repository
            .delete_account_credentials(account_id.to_string())
            .await?;
        self.repository.delete_account(account_id.to_string()).await?;
        self.feed.notify();
        Ok(())
    }

    /// Deletes one credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete_credential(&self, credential_id: &str) -> VaultResult<()> {
        self.repository
            .delete_credential(credential_id.to_string())
            .await?;
        self.feed.notify();
        Ok(())
    }

    /// All accounts ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_accounts(&self) -> VaultResult<Vec<Account>> {
        Ok(self.repository.list_accounts().await?)
    }

    /// All accounts with credential tallies.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn accounts_with_counts(&self) -> VaultResult<Vec<AccountWithCounts>> {
        Ok(self.repository.accounts_with_counts().await?)
    }

    /// One account, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn account_details(&self, account_id: &str) -> VaultResult<Option<Account>> {
        Ok(self.repository.get_account(account_id.to_string()).await?)
    }

    /// Credentials of one account ordered by key, values as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn account_credentials(&self, account_id: &str) -> VaultResult<Vec<Credential>> {
        Ok(self
            .repository
            .credentials_by_account(account_id.to_string())
            .await?)
    }

    /// One credential, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn credential(&self, credential_id: &str) -> VaultResult<Option<Credential>> {
        Ok(self
            .repository
            .get_credential(credential_id.to_string())
            .await?)
    }

    /// Snapshots of [`Self::accounts_with_counts`] after every mutation.
    #[must_use]
    pub fn subscribe_accounts_with_counts(&self) -> Subscription<Vec<AccountWithCounts>> {
        let repository = Arc::clone(&self.repository);
        Subscription::new(self.feed.subscribe(), move || {
            let repository = Arc::clone(&repository);
            async move { Ok(repository.accounts_with_counts().await?) }
        })
    }

    /// Snapshots of [`Self::account_details`] after every mutation.
    #[must_use]
    pub fn subscribe_account_details(&self, account_id: &str) -> Subscription<Option<Account>> {
        let repository = Arc::clone(&self.repository);
        let account_id = account_id.to_string();
        Subscription::new(self.feed.subscribe(), move || {
            let repository = Arc::clone(&repository);
            let account_id = account_id.clone();
            async move { Ok(repository.get_account(account_id).await?) }
        })
    }

    /// Snapshots of [`Self::account_credentials`] after every mutation.
    #[must_use]
    pub fn subscribe_account_credentials(&self, account_id: &str) -> Subscription<Vec<Credential>> {
        let repository = Arc::clone(&self.repository);
        let account_id = account_id.to_string();
        Subscription::new(self.feed.subscribe(), move || {
            let repository = Arc::clone(&repository);
            let account_id = account_id.clone();
            async move { Ok(repository.credentials_by_account(account_id).await?) }
        })
    }
}
