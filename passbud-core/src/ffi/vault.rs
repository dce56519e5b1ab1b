#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use crate::crypto::{
    Authentication, AuthenticatedHandle, CryptoObject, CryptoPurpose, HardwareKeystore, KeyState,
    ValidationResult,
};
use crate::error::VaultResult;
use crate::repository::{Account, AccountWithCounts, Credential, CredentialRepository};
use crate::vault::{BiometricCapability, BiometricInfo, ChangeListener, CredentialVault, VaultConfig};

/// Credential vault handle for foreign hosts.
///
/// Reactive lists are built by registering a [`ChangeListener`] and
/// re-querying on each revision.
#[derive(uniffi::Object)]
pub struct PassbudVault {
    inner: Arc<CredentialVault>,
}

impl PassbudVault {
    pub(crate) fn inner(&self) -> Arc<CredentialVault> {
        Arc::clone(&self.inner)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl PassbudVault {
    /// Creates a vault over the host's keystore, database and biometrics.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        config: VaultConfig,
        keystore: Arc<dyn HardwareKeystore>,
        repository: Arc<dyn CredentialRepository>,
        biometrics: Arc<dyn BiometricCapability>,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(CredentialVault::new(&config, keystore, repository, biometrics)),
        })
    }

    /// Creates a vault with the default key alias and size.
    #[uniffi::constructor]
    #[must_use]
    pub fn with_defaults(
        keystore: Arc<dyn HardwareKeystore>,
        repository: Arc<dyn CredentialRepository>,
        biometrics: Arc<dyn BiometricCapability>,
    ) -> Arc<Self> {
        Self::new(VaultConfig::default(), keystore, repository, biometrics)
    }

    /// See [`CredentialVault::biometric_info`].
    ///
    /// # Errors
    ///
    /// Returns an error if wiping after key loss fails.
    pub async fn biometric_info(&self) -> VaultResult<BiometricInfo> {
        self.inner.biometric_info().await
    }

    /// Validates the key, wiping all data if it was lost.
    ///
    /// # Errors
    ///
    /// Returns an error if wiping after key loss fails.
    pub async fn check_crypto_layer(&self) -> VaultResult<ValidationResult> {
        self.inner.check_crypto_layer().await
    }

    /// Current state of the encryption key.
    #[must_use]
    pub fn key_state(&self) -> KeyState {
        self.inner.engine().key_state()
    }

    /// Creates the crypto object for a biometric ceremony.
    ///
    /// # Errors
    ///
    /// See [`CredentialVault::create_crypto_object`].
    pub async fn create_crypto_object(
        &self,
        purpose: CryptoPurpose,
        iv: Option<String>,
    ) -> VaultResult<Arc<CryptoObject>> {
        self.inner.create_crypto_object(purpose, iv.as_deref()).await
    }

    /// Stores a credential. Pass the authenticated crypto object for
    /// encrypted credentials and `None` otherwise.
    ///
    /// # Errors
    ///
    /// See [`CredentialVault::save_credential`].
    pub async fn save_credential(
        &self,
        credential: Credential,
        crypto_object: Option<Arc<CryptoObject>>,
    ) -> VaultResult<Credential> {
        self.inner
            .save_credential(credential, Authentication::from(crypto_object))
            .await
    }

    /// Decrypts a stored value with an authenticated crypto object.
    ///
    /// # Errors
    ///
    /// See [`CredentialVault::decrypt_credential`].
    pub async fn decrypt_credential(
        &self,
        value: String,
        crypto_object: Arc<CryptoObject>,
    ) -> VaultResult<String> {
        let plaintext = self
            .inner
            .decrypt_credential(&value, AuthenticatedHandle::new(crypto_object))
            .await?;
        Ok(plaintext.to_string())
    }

    /// Creates an account and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn create_account(&self, name: String, description: String) -> VaultResult<String> {
        self.inner.create_account(&name, &description).await
    }

    /// Replaces an account's name and description.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub async fn update_account_details(&self, account: Account) -> VaultResult<()> {
        self.inner.update_account_details(account).await
    }

    /// Deletes an account and its credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete_account(&self, account_id: String) -> VaultResult<()> {
        self.inner.delete_account(&account_id).await
    }

    /// Deletes one credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete_credential(&self, credential_id: String) -> VaultResult<()> {
        self.inner.delete_credential(&credential_id).await
    }

    /// All accounts ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_accounts(&self) -> VaultResult<Vec<Account>> {
        self.inner.list_accounts().await
    }

    /// Accounts with credential tallies.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn accounts_with_counts(&self) -> VaultResult<Vec<AccountWithCounts>> {
        self.inner.accounts_with_counts().await
    }

    /// One account.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn account_details(&self, account_id: String) -> VaultResult<Option<Account>> {
        self.inner.account_details(&account_id).await
    }

    /// An account's credentials ordered by key, values as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn account_credentials(&self, account_id: String) -> VaultResult<Vec<Credential>> {
        self.inner.account_credentials(&account_id).await
    }

    /// Registers a listener called after every mutation.
    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.inner.feed().add_listener(listener);
    }

    /// Revision of the last mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.feed().revision()
    }
}
