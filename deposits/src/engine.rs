//! Time-deposit engine implementation.
//!
//! Creation deducts the principal from the owning account and maturation
//! credits principal plus interest back. Each runs as one atomic commit of
//! the balance change, its journal record, and the deposit row itself, so a
//! failed commit leaves no trace and a retry starts from clean state.
//! Maturation re-reads the deposit inside the account's critical section so
//! a deposit can only ever be credited once.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use tellercore_common::time::constants::default_lock_timeout;
use tellercore_common::{now, AccountNumber, DepositId, Money, Result, TellerError};
use tellercore_ledger::journal::{TransactionKind, TransactionRecord};
use tellercore_ledger::locks::AccountLockTable;
use tellercore_ledger::store::AccountStore;

use crate::deposit::{MaturityWindow, TimeDeposit};
use crate::rates::{annual_rate_for, interest_for};
use crate::store::DepositStore;

/// Longest term a deposit may run, in months.
pub const MAX_DURATION_MONTHS: u32 = 60;

/// Time-deposit engine configuration.
#[derive(Debug, Clone)]
pub struct DepositConfig {
    /// Upper bound on account lock acquisition per operation.
    pub lock_timeout: Duration,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            lock_timeout: default_lock_timeout(),
        }
    }
}

/// The time-deposit engine locks principal out of accounts and credits it
/// back with interest at maturity.
pub struct TimeDepositEngine {
    store: Arc<dyn AccountStore>,
    deposits: Arc<dyn DepositStore>,
    locks: Arc<AccountLockTable>,
    config: DepositConfig,
}

impl TimeDepositEngine {
    /// Create a new engine. The lock table must be shared with the ledger
    /// engine mutating the same account store.
    pub fn new(
        store: Arc<dyn AccountStore>,
        deposits: Arc<dyn DepositStore>,
        locks: Arc<AccountLockTable>,
        config: DepositConfig,
    ) -> Self {
        Self {
            store,
            deposits,
            locks,
            config,
        }
    }

    /// Create a deposit, locking `principal` out of the account.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        account_number: &str,
        principal: Decimal,
        duration_months: u32,
        window: MaturityWindow,
    ) -> Result<TimeDeposit> {
        let number = AccountNumber::parse(account_number)?;
        if duration_months == 0 || duration_months > MAX_DURATION_MONTHS {
            return Err(TellerError::InvalidDuration(duration_months));
        }
        let principal = Money::time_deposit_amount(principal)?;

        let _locks = self
            .locks
            .acquire(std::slice::from_ref(&number), self.config.lock_timeout)
            .await?;

        let mut account = self.store.get(&number).await?;
        if !account.can_transact() {
            return Err(TellerError::AccountFrozen(number));
        }

        let balance_before = account.balance;
        let balance_after =
            balance_before
                .checked_sub(principal)
                .ok_or_else(|| TellerError::InsufficientFunds {
                    account: number.clone(),
                    balance: balance_before,
                    requested: principal,
                })?;

        let interest_rate = annual_rate_for(duration_months);
        let created_at = now();
        let maturity_at = created_at + window.window(duration_months);
        let deposit = TimeDeposit::new(
            number.clone(),
            principal,
            duration_months,
            interest_rate,
            created_at,
            maturity_at,
        );

        account.balance = balance_after;
        account.last_transaction_at = Some(created_at);

        let record = TransactionRecord::new(
            number.clone(),
            TransactionKind::TimeDepositLock,
            principal,
            balance_before,
            balance_after,
            created_at,
            Some(*deposit.deposit_id.as_uuid()),
            format!("Time deposit lock, {duration_months} months"),
        );
        self.deposits.commit(&deposit, &[account], &[record]).await?;

        info!(
            account = %number,
            deposit_id = %deposit.deposit_id,
            principal = %principal,
            rate = %interest_rate,
            months = duration_months,
            "Time deposit created"
        );
        Ok(deposit)
    }

    /// Mature a deposit, crediting principal plus interest back to the
    /// account. With `force` the maturity date is ignored.
    #[instrument(skip(self))]
    pub async fn mature(&self, deposit_id: &DepositId, force: bool) -> Result<TimeDeposit> {
        // The first read only identifies the owning account; every decision
        // is made against the re-read below, inside the critical section.
        let number = self.deposits.get(deposit_id).await?.account_number;

        let _locks = self
            .locks
            .acquire(std::slice::from_ref(&number), self.config.lock_timeout)
            .await?;

        let mut deposit = self.deposits.get(deposit_id).await?;
        if deposit.is_matured() {
            return Err(TellerError::AlreadyMatured(*deposit_id));
        }
        let matured_at = now();
        if !force && matured_at < deposit.maturity_at {
            return Err(TellerError::NotYetMature {
                deposit_id: *deposit_id,
                maturity_at: deposit.maturity_at,
            });
        }

        let mut account = self.store.get(&deposit.account_number).await?;
        if !account.can_transact() {
            return Err(TellerError::AccountFrozen(deposit.account_number));
        }

        let interest = interest_for(deposit.principal, deposit.interest_rate, deposit.duration_months)?;
        let final_amount = deposit
            .principal
            .checked_add(interest)
            .ok_or_else(|| TellerError::LimitExceeded {
                account: deposit.account_number.clone(),
                balance: account.balance,
                requested: deposit.principal,
            })?;

        let balance_before = account.balance;
        let balance_after =
            balance_before
                .checked_add(final_amount)
                .ok_or_else(|| TellerError::LimitExceeded {
                    account: deposit.account_number.clone(),
                    balance: balance_before,
                    requested: final_amount,
                })?;

        account.balance = balance_after;
        account.last_transaction_at = Some(matured_at);

        let record = TransactionRecord::new(
            deposit.account_number.clone(),
            TransactionKind::TimeDepositMaturity,
            final_amount,
            balance_before,
            balance_after,
            matured_at,
            Some(*deposit.deposit_id.as_uuid()),
            format!("Time deposit maturity, {} months", deposit.duration_months),
        );
        deposit.mature(final_amount, matured_at);
        self.deposits.commit(&deposit, &[account], &[record]).await?;

        info!(
            account = %deposit.account_number,
            deposit_id = %deposit.deposit_id,
            final_amount = %final_amount,
            "Time deposit matured"
        );
        Ok(deposit)
    }

    /// All deposits for an account, newest first.
    pub async fn list(&self, account_number: &str) -> Result<Vec<TimeDeposit>> {
        let number = AccountNumber::parse(account_number)?;
        if !self.store.exists(&number).await? {
            return Err(TellerError::AccountNotFound(number));
        }
        self.deposits.list_by_account(&number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit::DepositStatus;
    use crate::store::MemoryDepositStore;
    use rust_decimal_macros::dec;
    use tellercore_ledger::account::Account;
    use tellercore_ledger::journal::{MemoryJournal, TransactionJournal};
    use tellercore_ledger::store::MemoryAccountStore;

    struct Fixture {
        engine: Arc<TimeDepositEngine>,
        journal: Arc<MemoryJournal>,
    }

    /// Engine over the demo seed set: 123456 -> 1000.00, 789012 -> 500.00,
    /// 555444 -> 0.00.
    async fn fixture() -> Fixture {
        let journal = Arc::new(MemoryJournal::new());
        let store = Arc::new(MemoryAccountStore::new(journal.clone()));
        for (number, cents) in [("123456", 100_000), ("789012", 50_000), ("555444", 0)] {
            store
                .put(Account::new(
                    AccountNumber::parse(number).unwrap(),
                    Money::from_minor_units(cents),
                ))
                .await
                .unwrap();
        }
        let deposits = Arc::new(MemoryDepositStore::new(store.clone()));
        let engine = Arc::new(TimeDepositEngine::new(
            store,
            deposits,
            Arc::new(AccountLockTable::new()),
            DepositConfig::default(),
        ));
        Fixture { engine, journal }
    }

    #[tokio::test]
    async fn test_create_locks_principal() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();
        assert_eq!(deposit.principal, Money::from_minor_units(10_000));
        assert_eq!(deposit.interest_rate, dec!(0.025));
        assert_eq!(deposit.status, DepositStatus::Active);
        assert_eq!(
            deposit.maturity_at - deposit.created_at,
            chrono::Duration::days(360)
        );

        let records = f
            .journal
            .query_by_account(&deposit.account_number, 10, 0)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, TransactionKind::TimeDepositLock);
        assert_eq!(records[0].balance_after, Money::from_minor_units(90_000));
        assert_eq!(records[0].reference_id, Some(*deposit.deposit_id.as_uuid()));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_durations() {
        let f = fixture().await;
        for months in [0, 61, 120] {
            let err = f
                .engine
                .create("123456", dec!(100.00), months, MaturityWindow::Standard)
                .await
                .unwrap_err();
            assert_eq!(err, TellerError::InvalidDuration(months));
        }
        assert_eq!(f.journal.len(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_principals() {
        let f = fixture().await;
        assert!(f
            .engine
            .create("123456", dec!(0), 12, MaturityWindow::Standard)
            .await
            .is_err());
        assert!(f
            .engine
            .create("123456", dec!(-1.00), 12, MaturityWindow::Standard)
            .await
            .is_err());
        // Over the per-deposit ceiling of 100000.00.
        assert!(f
            .engine
            .create("123456", dec!(100000.01), 12, MaturityWindow::Standard)
            .await
            .is_err());
        assert_eq!(f.journal.len(), 0);
    }

    #[tokio::test]
    async fn test_create_insufficient_funds() {
        let f = fixture().await;
        let err = f
            .engine
            .create("555444", dec!(10.00), 6, MaturityWindow::Standard)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert_eq!(f.journal.len(), 0);
        assert!(f.engine.list("555444").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_force_mature_credits_principal_plus_interest() {
        // 100.00 at 12 months earns 2.5%, so maturity credits 102.50.
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();

        let matured = f.engine.mature(&deposit.deposit_id, true).await.unwrap();
        assert_eq!(matured.status, DepositStatus::Matured);
        assert_eq!(matured.final_amount, Some(Money::from_minor_units(10_250)));
        assert!(matured.matured_at.is_some());

        let records = f
            .journal
            .query_by_account(&deposit.account_number, 10, 0)
            .await
            .unwrap();
        assert_eq!(records[0].kind, TransactionKind::TimeDepositMaturity);
        assert_eq!(records[0].amount, Money::from_minor_units(10_250));
        // 1000.00 - 100.00 + 102.50.
        assert_eq!(records[0].balance_after, Money::from_minor_units(100_250));
        assert_eq!(records[0].reference_id, Some(*deposit.deposit_id.as_uuid()));
    }

    #[tokio::test]
    async fn test_duration_between_tiers_uses_next_tier_rate() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 7, MaturityWindow::Standard)
            .await
            .unwrap();
        assert_eq!(deposit.interest_rate, dec!(0.025));
    }

    #[tokio::test]
    async fn test_mature_before_maturity_rejected() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();

        let err = f.engine.mature(&deposit.deposit_id, false).await.unwrap_err();
        assert_eq!(
            err,
            TellerError::NotYetMature {
                deposit_id: deposit.deposit_id,
                maturity_at: deposit.maturity_at,
            }
        );
        // Only the lock record exists.
        assert_eq!(f.journal.len(), 1);
    }

    #[tokio::test]
    async fn test_mature_twice_rejected() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();
        f.engine.mature(&deposit.deposit_id, true).await.unwrap();

        let err = f.engine.mature(&deposit.deposit_id, true).await.unwrap_err();
        assert_eq!(err, TellerError::AlreadyMatured(deposit.deposit_id));
        // One lock, one maturity, no second credit.
        assert_eq!(f.journal.len(), 2);
    }

    #[tokio::test]
    async fn test_mature_unknown_deposit() {
        let f = fixture().await;
        let id = DepositId::new();
        assert_eq!(
            f.engine.mature(&id, true).await.unwrap_err(),
            TellerError::DepositNotFound(id)
        );
    }

    #[tokio::test]
    async fn test_accelerated_window_matures_without_force() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("789012", dec!(50.00), 3, MaturityWindow::Accelerated)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let matured = f.engine.mature(&deposit.deposit_id, false).await.unwrap();
        // 50.00 at 1.5% over 3 months -> 0.1875 -> 0.19.
        assert_eq!(matured.final_amount, Some(Money::from_minor_units(5_019)));
    }

    #[tokio::test]
    async fn test_concurrent_force_mature_credits_once() {
        let f = fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = f.engine.clone();
            let id = deposit.deposit_id;
            handles.push(tokio::spawn(async move { engine.mature(&id, true).await }));
        }

        let mut successes = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(TellerError::AlreadyMatured(_)) => already += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(already, 1);
        // Lock + exactly one maturity credit.
        assert_eq!(f.journal.len(), 2);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let f = fixture().await;
        let first = f
            .engine
            .create("123456", dec!(10.00), 1, MaturityWindow::Standard)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f
            .engine
            .create("123456", dec!(20.00), 6, MaturityWindow::Standard)
            .await
            .unwrap();

        let listed = f.engine.list("123456").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].deposit_id, second.deposit_id);
        assert_eq!(listed[1].deposit_id, first.deposit_id);
    }

    #[tokio::test]
    async fn test_list_unknown_account() {
        let f = fixture().await;
        assert!(matches!(
            f.engine.list("999999").await,
            Err(TellerError::AccountNotFound(_))
        ));
    }

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tellercore_ledger::store::AccountStore;

    /// Deposit store whose next commit fails, standing in for a dropped
    /// database connection.
    struct FlakyDepositStore {
        inner: MemoryDepositStore,
        fail_next: AtomicBool,
    }

    impl FlakyDepositStore {
        fn new(accounts: Arc<dyn AccountStore>) -> Self {
            Self {
                inner: MemoryDepositStore::new(accounts),
                fail_next: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl crate::store::DepositStore for FlakyDepositStore {
        async fn get(&self, deposit_id: &DepositId) -> tellercore_common::Result<TimeDeposit> {
            self.inner.get(deposit_id).await
        }

        async fn commit(
            &self,
            deposit: &TimeDeposit,
            accounts: &[tellercore_ledger::account::Account],
            records: &[TransactionRecord],
        ) -> tellercore_common::Result<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(TellerError::StoreUnavailable("connection reset".into()));
            }
            self.inner.commit(deposit, accounts, records).await
        }

        async fn list_by_account(
            &self,
            account_number: &AccountNumber,
        ) -> tellercore_common::Result<Vec<TimeDeposit>> {
            self.inner.list_by_account(account_number).await
        }
    }

    struct FlakyFixture {
        engine: Arc<TimeDepositEngine>,
        deposits: Arc<FlakyDepositStore>,
        journal: Arc<MemoryJournal>,
    }

    /// Engine over 123456 -> 1000.00 with a failure-injecting deposit store.
    async fn flaky_fixture() -> FlakyFixture {
        let journal = Arc::new(MemoryJournal::new());
        let store = Arc::new(MemoryAccountStore::new(journal.clone()));
        store
            .put(Account::new(
                AccountNumber::parse("123456").unwrap(),
                Money::from_minor_units(100_000),
            ))
            .await
            .unwrap();
        let deposits = Arc::new(FlakyDepositStore::new(store.clone()));
        let engine = Arc::new(TimeDepositEngine::new(
            store,
            deposits.clone(),
            Arc::new(AccountLockTable::new()),
            DepositConfig::default(),
        ));
        FlakyFixture {
            engine,
            deposits,
            journal,
        }
    }

    #[tokio::test]
    async fn test_mature_retry_after_store_failure_credits_once() {
        let f = flaky_fixture().await;
        let deposit = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap();

        f.deposits.fail_next.store(true, Ordering::SeqCst);
        let err = f.engine.mature(&deposit.deposit_id, true).await.unwrap_err();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");

        // The failed commit left no trace: principal still locked, no
        // maturity record.
        let account = AccountNumber::parse("123456").unwrap();
        let records = f.journal.query_by_account(&account, 10, 0).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].balance_after, Money::from_minor_units(90_000));

        // The retry credits exactly once: 900.00 + 102.50.
        let matured = f.engine.mature(&deposit.deposit_id, true).await.unwrap();
        assert_eq!(matured.final_amount, Some(Money::from_minor_units(10_250)));
        let records = f.journal.query_by_account(&account, 10, 0).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].balance_after, Money::from_minor_units(100_250));

        // And the deposit is terminal.
        let err = f.engine.mature(&deposit.deposit_id, true).await.unwrap_err();
        assert_eq!(err, TellerError::AlreadyMatured(deposit.deposit_id));
    }

    #[tokio::test]
    async fn test_create_store_failure_leaves_balance_intact() {
        let f = flaky_fixture().await;
        f.deposits.fail_next.store(true, Ordering::SeqCst);

        let err = f
            .engine
            .create("123456", dec!(100.00), 12, MaturityWindow::Standard)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");

        // No debit, no journal entry, no stranded deposit.
        assert_eq!(f.journal.len(), 0);
        assert!(f.engine.list("123456").await.unwrap().is_empty());
    }
}
