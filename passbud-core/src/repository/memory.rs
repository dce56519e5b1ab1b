//! In-memory [`CredentialRepository`].
//!
//! Nothing survives the process. Besides the trait it records how many
//! writes and wipes reached it, which is what the vault tests assert on.

// Allow certain clippy lints for the inspection hooks
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use super::{
    Account, AccountWithCounts, Credential, CredentialRepository, RepositoryError,
    RepositoryResult,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    credentials: HashMap<String, Credential>,
}

impl Tables {
    fn sorted_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        accounts
    }

    fn credentials_of<'a>(&'a self, account_id: &'a str) -> impl Iterator<Item = &'a Credential> {
        self.credentials
            .values()
            .filter(move |credential| credential.account_id == account_id)
    }
}

/// Repository keeping accounts and credentials in hash maps.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    failing: AtomicBool,
    writes: AtomicUsize,
    wipes: AtomicUsize,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with [`RepositoryError::Storage`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of mutating calls that succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `delete_all_accounts` calls that succeeded.
    #[must_use]
    pub fn wipe_count(&self) -> usize {
        self.wipes.load(Ordering::SeqCst)
    }

    /// Total credentials stored across all accounts.
    pub async fn credential_count(&self) -> usize {
        self.tables.read().await.credentials.len()
    }

    fn check(&self) -> RepositoryResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("memory repository disabled".to_string()));
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CredentialRepository for MemoryRepository {
    async fn create_account(&self, account: Account) -> RepositoryResult<()> {
        self.check()?;
        self.tables
            .write()
            .await
            .accounts
            .insert(account.account_id.clone(), account);
        self.wrote();
        Ok(())
    }

    async fn update_account(&self, account: Account) -> RepositoryResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let existing = tables
            .accounts
            .get_mut(&account.account_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("account {}", account.account_id)))?;
        *existing = account;
        self.wrote();
        Ok(())
    }

    async fn get_account(&self, account_id: String) -> RepositoryResult<Option<Account>> {
        self.check()?;
        Ok(self.tables.read().await.accounts.get(&account_id).cloned())
    }

    async fn list_accounts(&self) -> RepositoryResult<Vec<Account>> {
        self.check()?;
        Ok(self.tables.read().await.sorted_accounts())
    }

    async fn accounts_with_counts(&self) -> RepositoryResult<Vec<AccountWithCounts>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .sorted_accounts()
            .iter()
            .map(|account| AccountWithCounts::tally(account, tables.credentials_of(&account.account_id)))
            .collect())
    }

    async fn credentials_by_account(&self, account_id: String) -> RepositoryResult<Vec<Credential>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut credentials: Vec<Credential> = tables.credentials_of(&account_id).cloned().collect();
        credentials.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then_with(|| a.credential_id.cmp(&b.credential_id))
        });
        Ok(credentials)
    }

    async fn get_credential(&self, credential_id: String) -> RepositoryResult<Option<Credential>> {
        self.check()?;
        Ok(self.tables.read().await.credentials.get(&credential_id).cloned())
    }

    async fn upsert_credential(&self, credential: Credential) -> RepositoryResult<()> {
        self.check()?;
        if credential.credential_id.is_empty() {
            return Err(RepositoryError::InvalidRecord(
                "credential id must be assigned before storing".to_string(),
            ));
        }
        self.tables
            .write()
            .await
            .credentials
            .insert(credential.credential_id.clone(), credential);
        self.wrote();
        Ok(())
    }

    async fn delete_account(&self, account_id: String) -> RepositoryResult<()> {
        self.check()?;
        self.tables.write().await.accounts.remove(&account_id);
        self.wrote();
        Ok(())
    }

    async fn delete_account_credentials(&self, account_id: String) -> RepositoryResult<()> {
        self.check()?;
        self.tables
            .write()
            .await
            .credentials
            .retain(|_, credential| credential.account_id != account_id);
        self.wrote();
        Ok(())
    }

    async fn delete_credential(&self, credential_id: String) -> RepositoryResult<()> {
        self.check()?;
        self.tables.write().await.credentials.remove(&credential_id);
        self.wrote();
        Ok(())
    }

    async fn delete_all_credentials(&self) -> RepositoryResult<()> {
        self.check()?;
        self.tables.write().await.credentials.clear();
        self.wrote();
        Ok(())
    }

    async fn delete_all_accounts(&self) -> RepositoryResult<()> {
        self.check()?;
        self.tables.write().await.accounts.clear();
        self.wrote();
        self.wipes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
