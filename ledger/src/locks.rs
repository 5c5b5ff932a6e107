//! Per-account lock table.
//!
//! Every balance-affecting operation runs inside a critical section covering
//! its affected account set. Locks are always acquired in ascending
//! account-number order so that two transfers between the same accounts in
//! opposite directions cannot deadlock. Acquisition is bounded by a timeout
//! and surfaces a retryable `Busy` error instead of blocking indefinitely.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use tellercore_common::time::constants::BUSY_RETRY_AFTER_MS;
use tellercore_common::{AccountNumber, Result, TellerError};

/// Table of per-account mutexes shared by the ledger and time-deposit
/// engines.
#[derive(Default)]
pub struct AccountLockTable {
    locks: DashMap<AccountNumber, Arc<Mutex<()>>>,
}

/// Guards held for one atomic unit; released on drop.
#[derive(Debug)]
pub struct AccountLockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLockTable {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire locks for the given accounts, in ascending account-number
    /// order, within `timeout` overall.
    pub async fn acquire(
        &self,
        accounts: &[AccountNumber],
        timeout: Duration,
    ) -> Result<AccountLockSet> {
        let mut ordered: Vec<AccountNumber> = accounts.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = tokio::time::Instant::now() + timeout;
        let mut guards = Vec::with_capacity(ordered.len());

        for account in &ordered {
            let mutex = self
                .locks
                .entry(account.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();

            match tokio::time::timeout_at(deadline, mutex.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    warn!(account = %account, "Account lock acquisition timed out");
                    return Err(TellerError::Busy {
                        retry_after_ms: BUSY_RETRY_AFTER_MS,
                    });
                }
            }
        }

        Ok(AccountLockSet { _guards: guards })
    }
}
