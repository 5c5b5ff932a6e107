//! Append-only transaction journal.
//!
//! Every balance-affecting operation writes exactly one record per affected
//! account; transfer legs and time-deposit lock/maturity pairs are linked
//! through `reference_id`. Records are immutable once written.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tellercore_common::{AccountNumber, Money, RecordId, Result, Timestamp};

/// Kind of balance-affecting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    TimeDepositLock,
    TimeDepositMaturity,
}

impl TransactionKind {
    /// Stable string form used by the relational backing.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::TimeDepositLock => "time_deposit_lock",
            TransactionKind::TimeDepositMaturity => "time_deposit_maturity",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            "transfer_in" => Some(TransactionKind::TransferIn),
            "transfer_out" => Some(TransactionKind::TransferOut),
            "time_deposit_lock" => Some(TransactionKind::TimeDepositLock),
            "time_deposit_maturity" => Some(TransactionKind::TimeDepositMaturity),
            _ => None,
        }
    }
}

/// A single journal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID, time-ordered.
    pub id: RecordId,
    /// Account affected.
    pub account_number: AccountNumber,
    /// Operation kind.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: Money,
    /// Balance before the operation.
    pub balance_before: Money,
    /// Balance after the operation.
    pub balance_after: Money,
    /// When the operation ran.
    pub timestamp: Timestamp,
    /// Links paired records: both transfer legs, or a time deposit's
    /// lock and maturity records.
    pub reference_id: Option<Uuid>,
    /// Free-text description (transfer message, deposit note).
    pub description: String,
}

impl TransactionRecord {
    /// Create a new record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_number: AccountNumber,
        kind: TransactionKind,
        amount: Money,
        balance_before: Money,
        balance_after: Money,
        timestamp: Timestamp,
        reference_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            account_number,
            kind,
            amount,
            balance_before,
            balance_after,
            timestamp,
            reference_id,
            description: description.into(),
        }
    }
}

/// Append-only journal of every balance-affecting operation.
#[async_trait]
pub trait TransactionJournal: Send + Sync {
    /// Append records. Fails only on store unavailability, which is fatal.
    async fn append(&self, records: &[TransactionRecord]) -> Result<()>;

    /// Records for one account, newest first.
    async fn query_by_account(
        &self,
        account_number: &AccountNumber,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>>;
}

/// In-memory journal backing.
#[derive(Default)]
pub struct MemoryJournal {
    records: RwLock<Vec<TransactionRecord>>,
}

impl MemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records, across all accounts.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl TransactionJournal for MemoryJournal {
    async fn append(&self, records: &[TransactionRecord]) -> Result<()> {
        self.records.write().extend_from_slice(records);
        Ok(())
    }

    async fn query_by_account(
        &self,
        account_number: &AccountNumber,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        // Records are appended in timestamp order, so reverse iteration
        // yields newest first with a stable tie-break.
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .filter(|r| &r.account_number == account_number)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellercore_common::now;

    fn record(account: &str, kind: TransactionKind, cents: i64) -> TransactionRecord {
        TransactionRecord::new(
            AccountNumber::parse(account).unwrap(),
            kind,
            Money::from_minor_units(cents),
            Money::ZERO,
            Money::from_minor_units(cents),
            now(),
            None,
            "test",
        )
    }

    #[tokio::test]
    async fn test_query_newest_first() {
        let journal = MemoryJournal::new();
        journal
            .append(&[record("123456", TransactionKind::Deposit, 100)])
            .await
            .unwrap();
        journal
            .append(&[record("123456", TransactionKind::Withdrawal, 50)])
            .await
            .unwrap();

        let acct = AccountNumber::parse("123456").unwrap();
        let records = journal.query_by_account(&acct, 10, 0).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, TransactionKind::Withdrawal);
        assert_eq!(records[1].kind, TransactionKind::Deposit);
    }

    #[tokio::test]
    async fn test_query_filters_and_paginates() {
        let journal = MemoryJournal::new();
        for _ in 0..5 {
            journal
                .append(&[
                    record("123456", TransactionKind::Deposit, 100),
                    record("789012", TransactionKind::Deposit, 200),
                ])
                .await
                .unwrap();
        }

        let acct = AccountNumber::parse("123456").unwrap();
        let page = journal.query_by_account(&acct, 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|r| r.account_number == acct));

        let tail = journal.query_by_account(&acct, 10, 4).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::TransferIn,
            TransactionKind::TransferOut,
            TransactionKind::TimeDepositLock,
            TransactionKind::TimeDepositMaturity,
        ] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::parse("settlement"), None);
    }
}
