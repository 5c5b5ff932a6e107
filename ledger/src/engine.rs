//! Core ledger engine implementation.
//!
//! Each operation validates its inputs before touching any store, then runs
//! the read-validate-commit cycle inside the account lock table's critical
//! section for the affected account set. Transfers cover both accounts in a
//! single atomic unit.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tellercore_common::time::constants::default_lock_timeout;
use tellercore_common::{now, AccountNumber, Money, Result, TellerError, Timestamp};

use crate::account::Account;
use crate::journal::{TransactionJournal, TransactionKind, TransactionRecord};
use crate::locks::AccountLockTable;
use crate::store::AccountStore;

/// Ledger engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Upper bound on account lock acquisition per operation.
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: default_lock_timeout(),
        }
    }
}

/// Result of a balance query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_number: AccountNumber,
    pub balance: Money,
    pub last_transaction_at: Option<Timestamp>,
}

/// Result of a successful deposit or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub account_number: AccountNumber,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub amount: Money,
    pub timestamp: Timestamp,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub sender_account: AccountNumber,
    pub recipient_account: AccountNumber,
    pub sender_previous_balance: Money,
    pub sender_new_balance: Money,
    pub recipient_new_balance: Money,
    pub amount: Money,
    /// Shared by the transfer_out and transfer_in journal records.
    pub reference_id: Uuid,
    pub timestamp: Timestamp,
}

/// The ledger engine applies deposits, withdrawals, and transfers against
/// the account store with atomicity and validation.
pub struct LedgerEngine {
    store: Arc<dyn AccountStore>,
    journal: Arc<dyn TransactionJournal>,
    locks: Arc<AccountLockTable>,
    config: LedgerConfig,
}

impl LedgerEngine {
    /// Create a new ledger engine. The lock table must be shared with every
    /// other engine mutating the same store.
    pub fn new(
        store: Arc<dyn AccountStore>,
        journal: Arc<dyn TransactionJournal>,
        locks: Arc<AccountLockTable>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            journal,
            locks,
            config,
        }
    }

    /// Get the current balance of an account.
    pub async fn get_balance(&self, account_number: &str) -> Result<BalanceSnapshot> {
        let number = AccountNumber::parse(account_number)?;
        let account = self.store.get(&number).await?;
        Ok(BalanceSnapshot {
            account_number: account.account_number,
            balance: account.balance,
            last_transaction_at: account.last_transaction_at,
        })
    }

    /// Deposit into an account.
    #[instrument(skip(self))]
    pub async fn deposit(&self, account_number: &str, amount: Decimal) -> Result<TransactionReceipt> {
        let number = AccountNumber::parse(account_number)?;
        let amount = Money::transaction_amount(amount)?;

        let _locks = self
            .locks
            .acquire(std::slice::from_ref(&number), self.config.lock_timeout)
            .await?;

        let mut account = self.store.get(&number).await?;
        if !account.can_transact() {
            return Err(TellerError::AccountFrozen(number));
        }

        let balance_before = account.balance;
        let balance_after = balance_before
            .checked_add(amount)
            .filter(|b| *b <= Money::MAX_BALANCE)
            .ok_or_else(|| TellerError::LimitExceeded {
                account: number.clone(),
                balance: balance_before,
                requested: amount,
            })?;

        let timestamp = now();
        account.balance = balance_after;
        account.last_transaction_at = Some(timestamp);

        let record = TransactionRecord::new(
            number.clone(),
            TransactionKind::Deposit,
            amount,
            balance_before,
            balance_after,
            timestamp,
            None,
            "ATM deposit",
        );
        self.store.commit(&[account], &[record]).await?;

        info!(
            account = %number,
            amount = %amount,
            balance = %balance_after,
            "Deposit applied"
        );

        Ok(TransactionReceipt {
            account_number: number,
            previous_balance: balance_before,
            new_balance: balance_after,
            amount,
            timestamp,
        })
    }

    /// Withdraw from an account.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, account_number: &str, amount: Decimal) -> Result<TransactionReceipt> {
        let number = AccountNumber::parse(account_number)?;
        let amount = Money::transaction_amount(amount)?;

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
                .checked_sub(amount)
                .ok_or_else(|| TellerError::InsufficientFunds {
                    account: number.clone(),
                    balance: balance_before,
                    requested: amount,
                })?;

        let timestamp = now();
        account.balance = balance_after;
        account.last_transaction_at = Some(timestamp);

        let record = TransactionRecord::new(
            number.clone(),
            TransactionKind::Withdrawal,
            amount,
            balance_before,
            balance_after,
            timestamp,
            None,
            "ATM withdrawal",
        );
        self.store.commit(&[account], &[record]).await?;

        info!(
            account = %number,
            amount = %amount,
            balance = %balance_after,
            "Withdrawal applied"
        );

        Ok(TransactionReceipt {
            account_number: number,
            previous_balance: balance_before,
            new_balance: balance_after,
            amount,
            timestamp,
        })
    }

    /// Transfer between two accounts as one atomic unit: either both
    /// balances move or neither is visible.
    #[instrument(skip(self, message))]
    pub async fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
        message: Option<&str>,
    ) -> Result<TransferReceipt> {
        let sender_number = AccountNumber::parse(sender)?;
        let recipient_number = AccountNumber::parse(recipient)?;
        if sender_number == recipient_number {
            return Err(TellerError::SameAccount);
        }
        let amount = Money::transaction_amount(amount)?;

        let _locks = self
            .locks
            .acquire(
                &[sender_number.clone(), recipient_number.clone()],
                self.config.lock_timeout,
            )
            .await?;

        // Sender is checked first so a missing sender is named ahead of a
        // missing recipient.
        let mut sender_account = self.store.get(&sender_number).await?;
        let mut recipient_account = self.store.get(&recipient_number).await?;
        if !sender_account.can_transact() {
            return Err(TellerError::AccountFrozen(sender_number));
        }
        if !recipient_account.can_transact() {
            return Err(TellerError::AccountFrozen(recipient_number));
        }

        let sender_before = sender_account.balance;
        let sender_after =
            sender_before
                .checked_sub(amount)
                .ok_or_else(|| TellerError::InsufficientFunds {
                    account: sender_number.clone(),
                    balance: sender_before,
                    requested: amount,
                })?;
        let recipient_before = recipient_account.balance;
        let recipient_after = recipient_before.checked_add(amount).ok_or_else(|| {
            TellerError::LimitExceeded {
                account: recipient_number.clone(),
                balance: recipient_before,
                requested: amount,
            }
        })?;

        let timestamp = now();
        let reference_id = Uuid::new_v4();
        let description = message.unwrap_or("Transfer").to_string();

        sender_account.balance = sender_after;
        sender_account.last_transaction_at = Some(timestamp);
        recipient_account.balance = recipient_after;
        recipient_account.last_transaction_at = Some(timestamp);

        let records = [
            TransactionRecord::new(
                sender_number.clone(),
                TransactionKind::TransferOut,
                amount,
                sender_before,
                sender_after,
                timestamp,
                Some(reference_id),
                description.clone(),
            ),
            TransactionRecord::new(
                recipient_number.clone(),
                TransactionKind::TransferIn,
                amount,
                recipient_before,
                recipient_after,
                timestamp,
                Some(reference_id),
                description,
            ),
        ];
        self.store
            .commit(&[sender_account, recipient_account], &records)
            .await?;

        info!(
            sender = %sender_number,
            recipient = %recipient_number,
            amount = %amount,
            reference_id = %reference_id,
            "Transfer applied"
        );

        Ok(TransferReceipt {
            sender_account: sender_number,
            recipient_account: recipient_number,
            sender_previous_balance: sender_before,
            sender_new_balance: sender_after,
            recipient_new_balance: recipient_after,
            amount,
            reference_id,
            timestamp,
        })
    }

    /// Create a new account with an opening balance.
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        account_number: &str,
        opening_balance: Decimal,
    ) -> Result<Account> {
        let number = AccountNumber::parse(account_number)?;
        let opening_balance = Money::from_decimal(opening_balance)?;
        if opening_balance > Money::MAX_BALANCE {
            return Err(TellerError::LimitExceeded {
                account: number,
                balance: Money::ZERO,
                requested: opening_balance,
            });
        }

        let _locks = self
            .locks
            .acquire(std::slice::from_ref(&number), self.config.lock_timeout)
            .await?;

        if self.store.exists(&number).await? {
            return Err(TellerError::AccountExists(number));
        }

        let account = Account::new(number.clone(), opening_balance);
        self.store.put(account.clone()).await?;

        info!(account = %number, balance = %opening_balance, "Account created");
        Ok(account)
    }

    /// Transaction history for an account, newest first.
    pub async fn transactions(
        &self,
        account_number: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let number = AccountNumber::parse(account_number)?;
        if !self.store.exists(&number).await? {
            return Err(TellerError::AccountNotFound(number));
        }
        self.journal.query_by_account(&number, limit, offset).await
    }
}
