//! Deposit store contract and in-memory backing.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tellercore_common::{AccountNumber, DepositId, Result, TellerError};
use tellercore_ledger::account::Account;
use tellercore_ledger::journal::TransactionRecord;
use tellercore_ledger::store::AccountStore;

use crate::deposit::TimeDeposit;

/// Keyed collection of time deposits.
#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Fetch a deposit, failing with `DepositNotFound` if absent.
    async fn get(&self, deposit_id: &DepositId) -> Result<TimeDeposit>;

    /// Atomically write the deposit row together with its account updates
    /// and journal records. Either everything becomes visible or nothing
    /// does; a balance change is never persisted without the deposit state
    /// that justifies it. The row is inserted on creation and replaced on
    /// maturation.
    async fn commit(
        &self,
        deposit: &TimeDeposit,
        accounts: &[Account],
        records: &[TransactionRecord],
    ) -> Result<()>;

    /// All deposits for an account, newest first.
    async fn list_by_account(&self, account_number: &AccountNumber) -> Result<Vec<TimeDeposit>>;
}

/// In-memory deposit store over the shared account store.
pub struct MemoryDepositStore {
    accounts: Arc<dyn AccountStore>,
    deposits: DashMap<DepositId, TimeDeposit>,
}

impl MemoryDepositStore {
    /// Create an empty store committing balance changes to `accounts`.
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            accounts,
            deposits: DashMap::new(),
        }
    }
}

#[async_trait]
impl DepositStore for MemoryDepositStore {
    async fn get(&self, deposit_id: &DepositId) -> Result<TimeDeposit> {
        self.deposits
            .get(deposit_id)
            .map(|entry| entry.clone())
            .ok_or(TellerError::DepositNotFound(*deposit_id))
    }

    async fn commit(
        &self,
        deposit: &TimeDeposit,
        accounts: &[Account],
        records: &[TransactionRecord],
    ) -> Result<()> {
        // Balances and journal land first; the map insert below cannot
        // fail, so a failed account commit leaves the deposit untouched.
        self.accounts.commit(accounts, records).await?;
        self.deposits.insert(deposit.deposit_id, deposit.clone());
        Ok(())
    }

    async fn list_by_account(&self, account_number: &AccountNumber) -> Result<Vec<TimeDeposit>> {
        let mut deposits: Vec<TimeDeposit> = self
            .deposits
            .iter()
            .filter(|entry| &entry.account_number == account_number)
            .map(|entry| entry.clone())
            .collect();
        deposits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deposits)
    }
}
