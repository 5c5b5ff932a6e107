//! The account store contract and its in-memory backing.
//!
//! The store is the single owner of account records. Balance mutation goes
//! through `commit`, which writes the updated accounts and their journal
//! records as one atomic unit; `put` exists for account creation and seeding
//! only. Callers must hold the engine's account locks across the
//! read-validate-commit cycle.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tellercore_common::{AccountNumber, Result, TellerError};

use crate::account::Account;
use crate::journal::{TransactionJournal, TransactionRecord};

/// Keyed collection of accounts; single source of truth for balances.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account, failing with `AccountNotFound` if absent.
    async fn get(&self, account_number: &AccountNumber) -> Result<Account>;

    /// Check whether an account exists.
    async fn exists(&self, account_number: &AccountNumber) -> Result<bool>;

    /// Insert or replace an account record. Not a balance-mutation path.
    async fn put(&self, account: Account) -> Result<()>;

    /// Atomically write updated accounts and append their journal records.
    /// Either everything becomes visible or nothing does; a balance write is
    /// never recorded without its journal entry, or vice versa.
    async fn commit(&self, accounts: &[Account], records: &[TransactionRecord]) -> Result<()>;
}

/// In-memory account store, used for tests and single-process deployments.
pub struct MemoryAccountStore {
    accounts: DashMap<AccountNumber, Account>,
    journal: Arc<dyn TransactionJournal>,
}

impl MemoryAccountStore {
    /// Create an empty store writing journal records to `journal`.
    pub fn new(journal: Arc<dyn TransactionJournal>) -> Self {
        Self {
            accounts: DashMap::new(),
            journal,
        }
    }

    /// Number of accounts held.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if the store holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, account_number: &AccountNumber) -> Result<Account> {
        self.accounts
            .get(account_number)
            .map(|entry| entry.clone())
            .ok_or_else(|| TellerError::AccountNotFound(account_number.clone()))
    }

    async fn exists(&self, account_number: &AccountNumber) -> Result<bool> {
        Ok(self.accounts.contains_key(account_number))
    }

    async fn put(&self, account: Account) -> Result<()> {
        self.accounts.insert(account.account_number.clone(), account);
        Ok(())
    }

    async fn commit(&self, accounts: &[Account], records: &[TransactionRecord]) -> Result<()> {
        // The caller holds the per-account locks, so nothing else writes
        // these entries while the batch lands. Readers that bypass the lock
        // table (balance queries) may observe the first insert of a
        // multi-account batch before the second; the relational backing
        // commits the whole batch in one database transaction.
        for account in accounts {
            self.accounts
                .insert(account.account_number.clone(), account.clone());
        }
        self.journal.append(records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use tellercore_common::Money;

    fn store() -> MemoryAccountStore {
        MemoryAccountStore::new(Arc::new(MemoryJournal::new()))
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let store = store();
        let acct = AccountNumber::parse("123456").unwrap();
        assert_eq!(
            store.get(&acct).await.unwrap_err(),
            TellerError::AccountNotFound(acct)
        );
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = store();
        let number = AccountNumber::parse("123456").unwrap();
        store
            .put(Account::new(number.clone(), Money::from_minor_units(100_000)))
            .await
            .unwrap();

        assert!(store.exists(&number).await.unwrap());
        let account = store.get(&number).await.unwrap();
        assert_eq!(account.balance, Money::from_minor_units(100_000));
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = store();
        let number = AccountNumber::parse("123456").unwrap();
        store
            .put(Account::new(number.clone(), Money::ZERO))
            .await
            .unwrap();
        store
            .put(Account::new(number.clone(), Money::from_minor_units(500)))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&number).await.unwrap().balance,
            Money::from_minor_units(500)
        );
    }
}
