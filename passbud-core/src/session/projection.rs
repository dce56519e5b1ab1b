use std::fmt;

use crate::repository::{Account, Credential};

/// A credential as shown on the account screen.
#[derive(Clone, PartialEq, Eq, uniffi::Record)]
pub struct CredentialView {
    /// The record as stored; `value` is ciphertext for encrypted entries.
    pub credential: Credential,
    /// Plaintext after a successful reveal.
    pub revealed_value: Option<String>,
}

impl CredentialView {
    /// The value to display.
    #[must_use]
    pub fn display_value(&self) -> &str {
        self.revealed_value
            .as_deref()
            .unwrap_or(&self.credential.value)
    }

    /// Whether the plaintext of an encrypted entry is showing.
    #[must_use]
    pub const fn is_revealed(&self) -> bool {
        self.revealed_value.is_some()
    }
}

impl fmt::Debug for CredentialView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialView")
            .field("credential", &self.credential)
            .field("revealed", &self.is_revealed())
            .finish()
    }
}

/// In-memory state of the account screen.
///
/// Decrypted values live here and nowhere else. Reloading drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct AccountProjection {
    /// The loaded account; `None` if it no longer exists.
    pub account: Option<Account>,
    /// Its credentials ordered by key.
    pub credentials: Vec<CredentialView>,
}

impl AccountProjection {
    pub(crate) fn loaded(account: Option<Account>, credentials: Vec<Credential>) -> Self {
        Self {
            account,
            credentials: credentials
                .into_iter()
                .map(|credential| CredentialView {
                    credential,
                    revealed_value: None,
                })
                .collect(),
        }
    }

    /// Id of the loaded account.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account.as_ref().map(|account| account.account_id.as_str())
    }

    /// Looks a credential up by id.
    #[must_use]
    pub fn credential(&self, credential_id: &str) -> Option<&CredentialView> {
        self.credentials
            .iter()
            .find(|view| view.credential.credential_id == credential_id)
    }

    pub(crate) fn reveal(&mut self, credential_id: &str, plaintext: String) -> bool {
        self.credentials
            .iter_mut()
            .find(|view| view.credential.credential_id == credential_id)
            .is_some_and(|view| {
                view.revealed_value = Some(plaintext);
                true
            })
    }

    pub(crate) fn hide(&mut self, credential_id: &str) {
        for view in &mut self.credentials {
            if view.credential.credential_id == credential_id {
                view.revealed_value = None;
            }
        }
    }
}
