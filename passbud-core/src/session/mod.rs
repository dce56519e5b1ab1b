//! The authenticate-then-operate protocol.
//!
//! ```text
//!            request_save / request_decrypt / request_delete
//!   Idle ───────────────────────────────────────────────────► AwaitingAuth(intent)
//!    ▲                                                               │
//!    └──────────── on_auth_succeeded / on_auth_error ◄───────────────┘
//! ```
//!
//! At most one intent is pending. A new request replaces the outstanding
//! one, and a ceremony result carrying the replaced intent's crypto object
//! is rejected as stale. Failures are reported through the message sink and
//! never leave the session in a half-applied state.

mod projection;
mod prompt;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use projection::{AccountProjection, CredentialView};
pub use prompt::{AuthContext, AuthErrorKind, DeleteTarget, IntentKind, PromptConfig};

use crate::codec::{check_bank_card, pack_bank_card};
use crate::crypto::{Authentication, AuthenticatedHandle, CryptoObject, CryptoPurpose};
use crate::error::{VaultError, VaultResult};
use crate::messages::{MessageSink, Messenger};
use crate::repository::{Account, Credential, CredentialType};
use crate::vault::{BiometricInfo, CredentialVault};
use crate::BankCard;

const ACCOUNT_FIELDS_REQUIRED: &str = "Name and description is required";
const KEY_RESET: &str = "Your key was invalidated and app data is reset";

/// Result of applying a ceremony outcome.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SessionOutcome {
    /// Nothing was pending; the result was ignored.
    NoPendingIntent,
    /// The pending credential was encrypted and stored.
    Saved {
        /// The record as stored.
        credential: Credential,
    },
    /// The credential's plaintext is now in the projection.
    Revealed {
        /// Id of the revealed credential.
        credential_id: String,
    },
    /// The confirmed delete was carried out.
    Deleted {
        /// What was deleted.
        target: DeleteTarget,
    },
    /// The intent was discarded; a message was emitted.
    Failed {
        /// Why.
        reason: String,
    },
}

enum Target {
    Save(Credential),
    Decrypt { credential_id: String },
    Delete(DeleteTarget),
}

struct PendingIntent {
    target: Target,
    context: AuthContext,
}

impl PendingIntent {
    fn session_id(&self) -> Option<u64> {
        self.context
            .crypto_object
            .as_ref()
            .map(|crypto_object| crypto_object.session_id())
    }
}

/// Binds pending intents to biometric ceremony results for one screen.
pub struct CryptoSession {
    vault: Arc<CredentialVault>,
    messenger: Messenger,
    pending: Mutex<Option<PendingIntent>>,
    projection: Mutex<AccountProjection>,
}

/// A crypto object from a replaced intent; deletes carry none and never match.
fn is_stale(expected: Option<u64>, presented: Option<u64>) -> bool {
    matches!((expected, presented), (Some(expected), Some(presented)) if expected != presented)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CryptoSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new(vault: Arc<CredentialVault>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            vault,
            messenger: Messenger::new(sink),
            pending: Mutex::new(None),
            projection: Mutex::new(AccountProjection::default()),
        }
    }

    /// The vault this session operates on.
    #[must_use]
    pub const fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    /// The prompt the host should currently show, if any.
    #[must_use]
    pub fn active_prompt(&self) -> Option<AuthContext> {
        lock(&self.pending)
            .as_ref()
            .map(|pending| pending.context.clone())
    }

    /// A snapshot of the account screen state.
    #[must_use]
    pub fn projection(&self) -> AccountProjection {
        lock(&self.projection).clone()
    }

    fn fail<T>(&self, err: VaultError) -> VaultResult<T> {
        self.messenger.send(err.to_string());
        Err(err)
    }

    fn replace_pending(&self, intent: Option<PendingIntent>) {
        let replaced = std::mem::replace(&mut *lock(&self.pending), intent);
        if let Some(replaced) = replaced {
            log::debug!("replaced pending {} intent", replaced.context.intent);
        }
    }

    async fn begin_crypto(
        &self,
        purpose: CryptoPurpose,
        iv: Option<&str>,
        target: Target,
    ) -> VaultResult<AuthContext> {
        match self.vault.create_crypto_object(purpose, iv).await {
            Ok(crypto_object) => {
                let context = AuthContext {
                    intent: purpose.into(),
                    crypto_object: Some(crypto_object),
                    prompt: PromptConfig::for_purpose(purpose),
                };
                self.replace_pending(Some(PendingIntent {
                    target,
                    context: context.clone(),
                }));
                Ok(context)
            }
            Err(err) => {
                self.replace_pending(None);
                self.fail(err)
            }
        }
    }

    /// Reads biometric status at startup and tells the user if their data
    /// was reset because the key had been invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault's wipe fails.
    pub async fn check_biometrics(&self) -> VaultResult<BiometricInfo> {
        let info = match self.vault.biometric_info().await {
            Ok(info) => info,
            Err(err) => return self.fail(err),
        };
        if info.was_reset() {
            self.messenger.send(KEY_RESET);
        }
        Ok(info)
    }

    /// Saves `credential`.
    ///
    /// Plaintext credentials are stored right away and `None` is returned.
    /// Encrypted ones become the pending intent and the returned context
    /// must be authenticated; the plaintext waits in memory until then.
    ///
    /// # Errors
    ///
    /// Returns the vault error after emitting it as a message.
    pub async fn request_save(&self, credential: Credential) -> VaultResult<Option<AuthContext>> {
        if !credential.is_encrypted {
            return match self
                .vault
                .save_credential(credential, Authentication::NotAuthenticated)
                .await
            {
                Ok(_) => {
                    self.refresh_projection().await;
                    Ok(None)
                }
                Err(err) => self.fail(err),
            };
        }
        self.begin_crypto(CryptoPurpose::Encryption, None, Target::Save(credential))
            .await
            .map(Some)
    }

    /// Starts revealing the stored credential `credential_id`.
    ///
    /// The credential is looked up again by id once the ceremony succeeds,
    /// so reordering or reloading the list in between is harmless.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if the credential does not exist
    /// - [`VaultError::InvalidInput`] if it is not encrypted
    /// - vault errors from creating the crypto object
    pub async fn request_decrypt(&self, credential_id: &str) -> VaultResult<AuthContext> {
        let credential = match self.vault.credential(credential_id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => return self.fail(VaultError::NotFound(format!("credential {credential_id}"))),
            Err(err) => return self.fail(err),
        };
        let Some(iv) = credential.encryption_iv.as_deref().filter(|_| credential.is_encrypted) else {
            return self.fail(VaultError::invalid_input(
                "credential_id",
                "credential is not encrypted",
            ));
        };
        self.begin_crypto(
            CryptoPurpose::Decryption,
            Some(iv),
            Target::Decrypt {
                credential_id: credential_id.to_string(),
            },
        )
        .await
    }

    /// Gates a delete behind a biometric prompt.
    #[must_use]
    pub fn request_delete(&self, is_account: bool, id: &str) -> AuthContext {
        let target = if is_account {
            DeleteTarget::Account {
                account_id: id.to_string(),
            }
        } else {
            DeleteTarget::Credential {
                credential_id: id.to_string(),
            }
        };
        let context = AuthContext {
            intent: IntentKind::Deletion,
            crypto_object: None,
            prompt: PromptConfig::for_delete(&target),
        };
        self.replace_pending(Some(PendingIntent {
            target: Target::Delete(target),
            context: context.clone(),
        }));
        context
    }

    /// Applies a successful ceremony to the pending intent.
    ///
    /// `crypto_object` is what the platform handed back; it must be the one
    /// from the pending context. A stale object is rejected and the pending
    /// intent stays in place for its own prompt; otherwise the intent is
    /// cleared.
    pub async fn on_auth_succeeded(
        &self,
        crypto_object: Option<Arc<CryptoObject>>,
    ) -> SessionOutcome {
        let presented = crypto_object.as_ref().map(|object| object.session_id());
        let claimed = {
            let mut slot = lock(&self.pending);
            match slot.as_ref().map(PendingIntent::session_id) {
                None => None,
                Some(expected) if is_stale(expected, presented) => Some(Err(expected)),
                Some(_) => slot.take().map(Ok),
            }
        };
        let pending = match claimed {
            None => {
                log::warn!("authentication succeeded with no pending intent");
                return SessionOutcome::NoPendingIntent;
            }
            Some(Err(expected)) => {
                log::warn!("rejecting crypto object {presented:?}, expected {expected:?}");
                return self.failed(VaultError::StaleCryptoObject.to_string());
            }
            Some(Ok(pending)) => pending,
        };

        let result = match pending.target {
            Target::Save(credential) => self.apply_save(credential, crypto_object).await,
            Target::Decrypt { credential_id } => {
                self.apply_decrypt(credential_id, crypto_object).await
            }
            Target::Delete(target) => self.apply_delete(target).await,
        };
        result.unwrap_or_else(|err| self.failed(err.to_string()))
    }

    fn failed(&self, reason: String) -> SessionOutcome {
        self.messenger.send(reason.clone());
        SessionOutcome::Failed { reason }
    }

    async fn apply_save(
        &self,
        credential: Credential,
        crypto_object: Option<Arc<CryptoObject>>,
    ) -> VaultResult<SessionOutcome> {
        let credential = self
            .vault
            .save_credential(credential, Authentication::from(crypto_object))
            .await?;
        self.refresh_projection().await;
        Ok(SessionOutcome::Saved { credential })
    }

    async fn apply_decrypt(
        &self,
        credential_id: String,
        crypto_object: Option<Arc<CryptoObject>>,
    ) -> VaultResult<SessionOutcome> {
        let crypto_object = crypto_object.ok_or(VaultError::MissingCryptoObject)?;
        let credential = self
            .vault
            .credential(&credential_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("credential {credential_id}")))?;
        let plaintext = self
            .vault
            .decrypt_credential(&credential.value, AuthenticatedHandle::new(crypto_object))
            .await?;
        if !lock(&self.projection).reveal(&credential_id, plaintext.to_string()) {
            log::debug!("revealed credential {credential_id} is not in the projection");
        }
        Ok(SessionOutcome::Revealed { credential_id })
    }

    async fn apply_delete(&self, target: DeleteTarget) -> VaultResult<SessionOutcome> {
        match &target {
            DeleteTarget::Account { account_id } => self.vault.delete_account(account_id).await?,
            DeleteTarget::Credential { credential_id } => {
                self.vault.delete_credential(credential_id).await?;
            }
        }
        self.refresh_projection().await;
        Ok(SessionOutcome::Deleted { target })
    }

    /// Ends the pending intent after a failed or canceled ceremony.
    ///
    /// Cancellations are silent; every other error shows `message`.
    #[must_use = "the error kind tells whether the ceremony was canceled"]
    pub fn on_auth_error(&self, code: i32, message: &str) -> AuthErrorKind {
        let kind = AuthErrorKind::from_code(code);
        self.replace_pending(None);
        if kind.is_cancellation() {
            log::debug!("biometric ceremony canceled ({kind})");
        } else {
            log::info!("biometric ceremony failed ({kind}): {message}");
            self.messenger.send(message);
        }
        kind
    }

    /// Loads an account into the projection. Revealed values are dropped.
    ///
    /// # Errors
    ///
    /// Returns the vault error after emitting it as a message.
    pub async fn load_account(&self, account_id: &str) -> VaultResult<AccountProjection> {
        let fetched = async {
            let account = self.vault.account_details(account_id).await?;
            let credentials = self.vault.account_credentials(account_id).await?;
            Ok::<_, VaultError>(AccountProjection::loaded(account, credentials))
        };
        match fetched.await {
            Ok(projection) => {
                *lock(&self.projection) = projection.clone();
                Ok(projection)
            }
            Err(err) => self.fail(err),
        }
    }

    async fn refresh_projection(&self) {
        let account_id = lock(&self.projection).account_id().map(str::to_string);
        if let Some(account_id) = account_id {
            if let Err(err) = self.load_account(&account_id).await {
                log::warn!("failed to refresh account {account_id}: {err}");
            }
        }
    }

    /// Hides a revealed value again.
    pub fn hide_credential(&self, credential_id: &str) {
        lock(&self.projection).hide(credential_id);
    }

    /// Creates an empty account. Name and description are required.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidInput`] for a blank name or description.
    pub async fn create_account(&self, name: &str, description: &str) -> VaultResult<String> {
        if name.trim().is_empty() || description.trim().is_empty() {
            self.messenger.send(ACCOUNT_FIELDS_REQUIRED);
            return Err(VaultError::invalid_input("name", ACCOUNT_FIELDS_REQUIRED));
        }
        match self.vault.create_account(name, description).await {
            Ok(account_id) => Ok(account_id),
            Err(err) => self.fail(err),
        }
    }

    /// Creates an account holding a plaintext username and an encrypted
    /// password. The password is saved once the returned context is
    /// authenticated.
    ///
    /// # Errors
    ///
    /// Returns the vault error after emitting it as a message.
    pub async fn create_account_with_login(
        &self,
        name: &str,
        description: &str,
        username: &str,
        password: &str,
    ) -> VaultResult<AuthContext> {
        let account_id = match self.vault.create_account(name, description).await {
            Ok(account_id) => account_id,
            Err(err) => return self.fail(err),
        };
        let login = Credential::new(&account_id, "Username", username, CredentialType::PlainValue, false);
        if let Err(err) = self
            .vault
            .save_credential(login, Authentication::NotAuthenticated)
            .await
        {
            return self.fail(err);
        }
        let password = Credential::new(&account_id, "Password", password, CredentialType::PlainValue, true);
        self.begin_crypto(CryptoPurpose::Encryption, None, Target::Save(password))
            .await
    }

    /// Creates an account holding one encrypted bank card named `card_name`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidInput`] if a card field contains `|`, before
    /// anything is written; otherwise the vault error after emitting it as a
    /// message.
    pub async fn create_account_with_card(
        &self,
        name: &str,
        card_name: &str,
        card: &BankCard,
    ) -> VaultResult<AuthContext> {
        if let Err(err) = check_bank_card(card) {
            return self.fail(err);
        }
        let account_id = match self.vault.create_account(name, "").await {
            Ok(account_id) => account_id,
            Err(err) => return self.fail(err),
        };
        let card = Credential::new(
            &account_id,
            card_name,
            pack_bank_card(card),
            CredentialType::BankCard,
            true,
        );
        self.begin_crypto(CryptoPurpose::Encryption, None, Target::Save(card))
            .await
    }

    /// Renames the loaded account.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidInput`] if no account is loaded; vault errors
    /// otherwise.
    pub async fn update_account_details(&self, name: &str, description: &str) -> VaultResult<()> {
        let Some(account) = lock(&self.projection).account.clone() else {
            return self.fail(VaultError::invalid_input("account", "no account loaded"));
        };
        let updated = Account {
            name: name.to_string(),
            description: description.to_string(),
            ..account
        };
        if let Err(err) = self.vault.update_account_details(updated).await {
            return self.fail(err);
        }
        self.refresh_projection().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SoftwareKeystore;
    use crate::messages::{ChannelMessageSink, UiMessage};
    use crate::repository::MemoryRepository;
    use crate::vault::{AuthenticatorAvailability, BiometricCapability, VaultConfig};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Ready;

    impl BiometricCapability for Ready {
        fn can_authenticate(&self) -> AuthenticatorAvailability {
            AuthenticatorAvailability::Success
        }
    }

    async fn session() -> (CryptoSession, UnboundedReceiver<UiMessage>) {
        let vault = Arc::new(CredentialVault::new(
            &VaultConfig::default(),
            Arc::new(SoftwareKeystore::new()),
            Arc::new(MemoryRepository::new()),
            Arc::new(Ready),
        ));
        let (sink, messages) = ChannelMessageSink::channel();
        let session = CryptoSession::new(vault, Arc::new(sink));
        session.check_biometrics().await.unwrap();
        (session, messages)
    }

    fn crypto_object(context: &AuthContext) -> Option<Arc<CryptoObject>> {
        context.crypto_object.clone()
    }

    #[tokio::test]
    async fn test_cancel_is_silent_and_clears_intent() {
        let (session, mut messages) = session().await;
        let credential = Credential::new("a", "PIN", "1234", CredentialType::PlainValue, true);
        session.request_save(credential).await.unwrap();
        assert!(session.active_prompt().is_some());

        assert_eq!(session.on_auth_error(10, "Canceled by user"), AuthErrorKind::UserCanceled);
        assert!(session.active_prompt().is_none());
        assert!(messages.try_recv().is_err());
        assert_eq!(
            session.on_auth_succeeded(None).await,
            SessionOutcome::NoPendingIntent
        );
    }

    #[tokio::test]
    async fn test_other_errors_emit_message() {
        let (session, mut messages) = session().await;
        let _context = session.request_delete(false, "c1");
        assert_eq!(session.on_auth_error(7, "Too many attempts"), AuthErrorKind::Lockout);
        assert_eq!(messages.try_recv().unwrap().text, "Too many attempts");
    }

    #[tokio::test]
    async fn test_delete_prompt_is_active_until_resolved() {
        let (session, _messages) = session().await;
        let context = session.request_delete(true, "acc");
        assert_eq!(context.intent, IntentKind::Deletion);
        assert!(context.crypto_object.is_none());
        assert_eq!(
            session.active_prompt().unwrap().prompt.subtitle,
            "Verify yourself to delete this account"
        );
    }

    #[tokio::test]
    async fn test_stale_crypto_object_is_rejected() {
        let (session, mut messages) = session().await;
        let first = Credential::new("a", "First", "1", CredentialType::PlainValue, true);
        let second = Credential::new("a", "Second", "2", CredentialType::PlainValue, true);
        let stale = session.request_save(first).await.unwrap().unwrap();
        let current = session.request_save(second).await.unwrap().unwrap();

        let outcome = session.on_auth_succeeded(crypto_object(&stale)).await;
        assert!(matches!(outcome, SessionOutcome::Failed { .. }));
        assert_eq!(
            messages.try_recv().unwrap().text,
            VaultError::StaleCryptoObject.to_string()
        );
        let active = session.active_prompt().expect("current intent survives");
        assert_eq!(
            crypto_object(&active).map(|object| object.session_id()),
            crypto_object(&current).map(|object| object.session_id())
        );
    }

    #[tokio::test]
    async fn test_blank_account_fields_rejected() {
        let (session, mut messages) = session().await;
        let result = session.create_account("Bank", "  ").await;
        assert!(matches!(result, Err(VaultError::InvalidInput { .. })));
        assert_eq!(messages.try_recv().unwrap().text, ACCOUNT_FIELDS_REQUIRED);
        assert!(session.vault().list_accounts().await.unwrap().is_empty());
    }
}
