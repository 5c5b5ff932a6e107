//! Service facade wiring both engines over one store and lock table.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use tracing::info;

use tellercore_common::{AccountNumber, DepositId, Money, Result};
use tellercore_deposits::{
    DepositConfig, DepositStore, MaturityWindow, MemoryDepositStore, PgDepositStore, TimeDeposit,
    TimeDepositEngine,
};
use tellercore_ledger::account::Account;
use tellercore_ledger::engine::{
    BalanceSnapshot, LedgerConfig, LedgerEngine, TransactionReceipt, TransferReceipt,
};
use tellercore_ledger::journal::{MemoryJournal, TransactionJournal, TransactionRecord};
use tellercore_ledger::locks::AccountLockTable;
use tellercore_ledger::postgres::{PgAccountStore, PgJournal};
use tellercore_ledger::store::{AccountStore, MemoryAccountStore};

use crate::config::TellerConfig;

/// Demonstration seed accounts: number and opening balance in minor units.
pub const DEMO_ACCOUNTS: [(&str, i64); 3] = [("123456", 100_000), ("789012", 50_000), ("555444", 0)];

/// The teller service exposes every ledger and time-deposit operation over
/// a single account store. Both engines share one lock table, so a deposit
/// maturation and a withdrawal against the same account never interleave.
pub struct TellerService {
    store: Arc<dyn AccountStore>,
    ledger: LedgerEngine,
    deposits: TimeDepositEngine,
}

impl TellerService {
    fn build(
        store: Arc<dyn AccountStore>,
        journal: Arc<dyn TransactionJournal>,
        deposits: Arc<dyn DepositStore>,
        config: &TellerConfig,
    ) -> Self {
        let locks = Arc::new(AccountLockTable::new());
        let ledger = LedgerEngine::new(
            store.clone(),
            journal,
            locks.clone(),
            LedgerConfig {
                lock_timeout: config.lock_timeout,
            },
        );
        let deposits = TimeDepositEngine::new(
            store.clone(),
            deposits,
            locks,
            DepositConfig {
                lock_timeout: config.lock_timeout,
            },
        );
        Self {
            store,
            ledger,
            deposits,
        }
    }

    /// Build a service over the in-memory backing.
    pub fn in_memory(config: &TellerConfig) -> Self {
        let journal = Arc::new(MemoryJournal::new());
        let store: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new(journal.clone()));
        let deposits = Arc::new(MemoryDepositStore::new(store.clone()));
        Self::build(store, journal, deposits, config)
    }

    /// Build a service over Postgres, creating the schema if needed.
    pub async fn postgres(pool: PgPool, config: &TellerConfig) -> Result<Self> {
        let store = PgAccountStore::new(pool.clone());
        store.setup().await?;
        let deposits = PgDepositStore::new(pool.clone());
        deposits.setup().await?;
        let journal = Arc::new(PgJournal::new(pool));
        Ok(Self::build(
            Arc::new(store),
            journal,
            Arc::new(deposits),
            config,
        ))
    }

    /// Seed the demonstration accounts. Existing accounts are left alone.
    pub async fn seed_demo_accounts(&self) -> Result<()> {
        for (number, cents) in DEMO_ACCOUNTS {
            let number = AccountNumber::parse(number)?;
            if self.store.exists(&number).await? {
                continue;
            }
            let account = Account::new(number.clone(), Money::from_minor_units(cents));
            self.store.put(account).await?;
            info!(account = %number, "Demo account seeded");
        }
        Ok(())
    }

    /// Get the current balance of an account.
    pub async fn balance(&self, account_number: &str) -> Result<BalanceSnapshot> {
        self.ledger.get_balance(account_number).await
    }

    /// Deposit into an account.
    pub async fn deposit(&self, account_number: &str, amount: Decimal) -> Result<TransactionReceipt> {
        self.ledger.deposit(account_number, amount).await
    }

    /// Withdraw from an account.
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: Decimal,
    ) -> Result<TransactionReceipt> {
        self.ledger.withdraw(account_number, amount).await
    }

    /// Transfer between two accounts atomically.
    pub async fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
        message: Option<&str>,
    ) -> Result<TransferReceipt> {
        self.ledger.transfer(sender, recipient, amount, message).await
    }

    /// Create a new account with an opening balance.
    pub async fn create_account(
        &self,
        account_number: &str,
        opening_balance: Decimal,
    ) -> Result<Account> {
        self.ledger.create_account(account_number, opening_balance).await
    }

    /// Transaction history for an account, newest first.
    pub async fn transactions(
        &self,
        account_number: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.ledger.transactions(account_number, limit, offset).await
    }

    /// Create a time deposit, locking the principal out of the account.
    pub async fn create_time_deposit(
        &self,
        account_number: &str,
        principal: Decimal,
        duration_months: u32,
        window: MaturityWindow,
    ) -> Result<TimeDeposit> {
        self.deposits
            .create(account_number, principal, duration_months, window)
            .await
    }

    /// Mature a time deposit, crediting principal plus interest back.
    pub async fn mature_time_deposit(
        &self,
        deposit_id: &DepositId,
        force: bool,
    ) -> Result<TimeDeposit> {
        self.deposits.mature(deposit_id, force).await
    }

    /// All time deposits for an account, newest first.
    pub async fn list_time_deposits(&self, account_number: &str) -> Result<Vec<TimeDeposit>> {
        self.deposits.list(account_number).await
    }
}
