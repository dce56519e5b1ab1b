//! Persistence collaborator for accounts and credentials.
//!
//! The vault never stores plaintext secrets itself: it hands fully prepared
//! records (ciphertext already base64-encoded) to a [`CredentialRepository`].
//! Hosts back the trait with their own database; [`MemoryRepository`] keeps
//! everything in process memory.

use std::fmt;

use strum::Display;
use thiserror::Error;

mod memory;

pub use memory::MemoryRepository;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a [`CredentialRepository`].
#[derive(Debug, Error, uniffi::Error)]
pub enum RepositoryError {
    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record cannot be stored as given.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for RepositoryError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// A named group of credentials.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct Account {
    /// Random UUID assigned at creation; never changes.
    pub account_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// How a credential's plaintext value is structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum CredentialType {
    /// A single opaque value.
    PlainValue,
    /// A bank card packed with [`crate::pack_bank_card`].
    BankCard,
}

impl CredentialType {
    /// The integer code used by relational storage.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::PlainValue => 0,
            Self::BankCard => 1,
        }
    }

    /// Maps a storage code back to a type.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::PlainValue),
            1 => Some(Self::BankCard),
            _ => None,
        }
    }
}

/// One labelled value inside an account.
///
/// `value` holds the plaintext when `is_encrypted` is false and base64
/// ciphertext once an encrypted credential has been saved. `encryption_iv`
/// is set exactly for saved encrypted credentials.
#[derive(Clone, PartialEq, Eq, uniffi::Record)]
pub struct Credential {
    /// Owning account.
    pub account_id: String,
    /// Random UUID assigned at first save; empty before that.
    pub credential_id: String,
    /// Display label, e.g. "Password".
    pub key: String,
    /// Plaintext or base64 ciphertext.
    pub value: String,
    /// Structure of the plaintext value.
    pub credential_type: CredentialType,
    /// Whether `value` is (or must become) ciphertext.
    pub is_encrypted: bool,
    /// Base64 IV of a saved encrypted value.
    pub encryption_iv: Option<String>,
}

impl Credential {
    /// A credential that has not been saved yet.
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        credential_type: CredentialType,
        is_encrypted: bool,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            credential_id: String::new(),
            key: key.into(),
            value: value.into(),
            credential_type,
            is_encrypted,
            encryption_iv: None,
        }
    }

    /// Whether the record holds ciphertext that can be decrypted.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.is_encrypted && self.encryption_iv.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.is_encrypted { "[sealed]" } else { "[plain]" };
        f.debug_struct("Credential")
            .field("account_id", &self.account_id)
            .field("credential_id", &self.credential_id)
            .field("key", &self.key)
            .field("value", &value)
            .field("credential_type", &self.credential_type)
            .field("is_encrypted", &self.is_encrypted)
            .field("encryption_iv", &self.encryption_iv)
            .finish()
    }
}

/// An account with per-kind credential tallies.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AccountWithCounts {
    /// Account id.
    pub account_id: String,
    /// Account name.
    pub name: String,
    /// Account description.
    pub description: String,
    /// Encrypted plain-value credentials.
    pub encrypted_count: u32,
    /// Credentials stored as plaintext.
    pub non_encrypted_count: u32,
    /// Bank card credentials, encrypted or not.
    pub cards_count: u32,
}

impl AccountWithCounts {
    /// Tallies `credentials` for `account`.
    #[must_use]
    pub fn tally<'a>(account: &Account, credentials: impl IntoIterator<Item = &'a Credential>) -> Self {
        let mut counts = Self {
            account_id: account.account_id.clone(),
            name: account.name.clone(),
            description: account.description.clone(),
            encrypted_count: 0,
            non_encrypted_count: 0,
            cards_count: 0,
        };
        for credential in credentials {
            if credential.is_encrypted && credential.credential_type == CredentialType::PlainValue {
                counts.encrypted_count += 1;
            }
            if !credential.is_encrypted {
                counts.non_encrypted_count += 1;
            }
            if credential.credential_type == CredentialType::BankCard {
                counts.cards_count += 1;
            }
        }
        counts
    }
}

/// Storage for accounts and credentials.
///
/// Implementations must:
/// - list accounts ordered by name
/// - list an account's credentials ordered by key
/// - treat `create_account` and `upsert_credential` as insert-or-replace
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Inserts `account`, replacing a row with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn create_account(&self, account: Account) -> RepositoryResult<()>;

    /// Updates name and description of an existing account.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if the account does not exist.
    async fn update_account(&self, account: Account) -> RepositoryResult<()>;

    /// Fetches one account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn get_account(&self, account_id: String) -> RepositoryResult<Option<Account>>;

    /// All accounts, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn list_accounts(&self) -> RepositoryResult<Vec<Account>>;

    /// All accounts with credential tallies, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn accounts_with_counts(&self) -> RepositoryResult<Vec<AccountWithCounts>>;

    /// Credentials of one account, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn credentials_by_account(&self, account_id: String) -> RepositoryResult<Vec<Credential>>;

    /// Fetches one credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn get_credential(&self, credential_id: String) -> RepositoryResult<Option<Credential>>;

    /// Inserts or replaces a credential keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn upsert_credential(&self, credential: Credential) -> RepositoryResult<()>;

    /// Deletes one account row. Credentials are deleted separately.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete_account(&self, account_id: String) -> RepositoryResult<()>;

    /// Deletes every credential of one account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete_account_credentials(&self, account_id: String) -> RepositoryResult<()>;

    /// Deletes one credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete_credential(&self, credential_id: String) -> RepositoryResult<()>;

    /// Deletes every credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete_all_credentials(&self) -> RepositoryResult<()>;

    /// Deletes every account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete_all_accounts(&self) -> RepositoryResult<()>;
}
