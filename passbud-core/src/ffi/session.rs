#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use super::PassbudVault;
use crate::codec::BankCard;
use crate::crypto::CryptoObject;
use crate::error::VaultResult;
use crate::messages::MessageSink;
use crate::repository::Credential;
use crate::session::{AccountProjection, AuthContext, AuthErrorKind, CryptoSession, SessionOutcome};
use crate::vault::BiometricInfo;

/// One screen's authenticate-then-operate session.
#[derive(uniffi::Object)]
pub struct PassbudSession {
    inner: CryptoSession,
}

#[uniffi::export(async_runtime = "tokio")]
impl PassbudSession {
    /// Creates an idle session on `vault`, reporting messages to `sink`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(vault: Arc<PassbudVault>, sink: Arc<dyn MessageSink>) -> Arc<Self> {
        Arc::new(Self {
            inner: CryptoSession::new(vault.inner(), sink),
        })
    }

    /// Startup check; emits a message if data was reset.
    ///
    /// # Errors
    ///
    /// Returns an error if wiping after key loss fails.
    pub async fn check_biometrics(&self) -> VaultResult<BiometricInfo> {
        self.inner.check_biometrics().await
    }

    /// Saves a credential, returning a context to authenticate for
    /// encrypted ones.
    ///
    /// # Errors
    ///
    /// See [`CryptoSession::request_save`].
    pub async fn request_save(&self, credential: Credential) -> VaultResult<Option<AuthContext>> {
        self.inner.request_save(credential).await
    }

    /// Starts revealing a stored credential.
    ///
    /// # Errors
    ///
    /// See [`CryptoSession::request_decrypt`].
    pub async fn request_decrypt(&self, credential_id: String) -> VaultResult<AuthContext> {
        self.inner.request_decrypt(&credential_id).await
    }

    /// Gates a delete behind a prompt.
    #[must_use]
    pub fn request_delete(&self, is_account: bool, id: String) -> AuthContext {
        self.inner.request_delete(is_account, &id)
    }

    /// Reports a successful ceremony.
    pub async fn on_auth_succeeded(
        &self,
        crypto_object: Option<Arc<CryptoObject>>,
    ) -> SessionOutcome {
        self.inner.on_auth_succeeded(crypto_object).await
    }

    /// Reports a failed or canceled ceremony.
    #[must_use]
    pub fn on_auth_error(&self, code: i32, message: String) -> AuthErrorKind {
        self.inner.on_auth_error(code, &message)
    }

    /// The prompt to show, if an intent is pending.
    #[must_use]
    pub fn active_prompt(&self) -> Option<AuthContext> {
        self.inner.active_prompt()
    }

    /// Current account screen state.
    #[must_use]
    pub fn projection(&self) -> AccountProjection {
        self.inner.projection()
    }

    /// Loads an account; revealed values are hidden again.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn load_account(&self, account_id: String) -> VaultResult<AccountProjection> {
        self.inner.load_account(&account_id).await
    }

    /// Hides a revealed value.
    pub fn hide_credential(&self, credential_id: String) {
        self.inner.hide_credential(&credential_id);
    }

    /// Creates an empty account.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank name or description.
    pub async fn create_account(&self, name: String, description: String) -> VaultResult<String> {
        self.inner.create_account(&name, &description).await
    }

    /// Creates an account with a username and an encrypted password.
    ///
    /// # Errors
    ///
    /// See [`CryptoSession::create_account_with_login`].
    pub async fn create_account_with_login(
        &self,
        name: String,
        description: String,
        username: String,
        password: String,
    ) -> VaultResult<AuthContext> {
        self.inner
            .create_account_with_login(&name, &description, &username, &password)
            .await
    }

    /// Creates an account with one encrypted bank card.
    ///
    /// # Errors
    ///
    /// See [`CryptoSession::create_account_with_card`].
    pub async fn create_account_with_card(
        &self,
        name: String,
        card_name: String,
        card: BankCard,
    ) -> VaultResult<AuthContext> {
        self.inner
            .create_account_with_card(&name, &card_name, &card)
            .await
    }

    /// Renames the loaded account.
    ///
    /// # Errors
    ///
    /// See [`CryptoSession::update_account_details`].
    pub async fn update_account_details(&self, name: String, description: String) -> VaultResult<()> {
        self.inner.update_account_details(&name, &description).await
    }
}
