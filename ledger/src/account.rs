//! Account definitions for the ledger.

use serde::{Deserialize, Serialize};

use tellercore_common::{now, AccountNumber, Money, Timestamp};

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Account is active and can transact.
    Active,
    /// Account is frozen (no transactions allowed).
    Frozen,
}

impl AccountStatus {
    /// Stable string form used by the relational backing.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "frozen" => Some(AccountStatus::Frozen),
            _ => None,
        }
    }
}

/// A customer account. Balance never goes negative; every mutation flows
/// through the ledger or time-deposit engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// 6-digit account number.
    pub account_number: AccountNumber,
    /// Current spendable balance.
    pub balance: Money,
    /// Account status.
    pub status: AccountStatus,
    /// When the account was created.
    pub created_at: Timestamp,
    /// When the last balance-affecting operation ran, if any.
    pub last_transaction_at: Option<Timestamp>,
}

impl Account {
    /// Create a new active account with an opening balance.
    pub fn new(account_number: AccountNumber, opening_balance: Money) -> Self {
        Self {
            account_number,
            balance: opening_balance,
            status: AccountStatus::Active,
            created_at: now(),
            last_transaction_at: None,
        }
    }

    /// Check if the account can transact.
    pub fn can_transact(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Freeze the account.
    pub fn freeze(&mut self) {
        self.status = AccountStatus::Frozen;
    }

    /// Unfreeze the account.
    pub fn unfreeze(&mut self) {
        self.status = AccountStatus::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_active() {
        let acct = Account::new(
            AccountNumber::parse("123456").unwrap(),
            Money::from_minor_units(100_000),
        );
        assert!(acct.can_transact());
        assert!(acct.last_transaction_at.is_none());
    }

    #[test]
    fn test_freeze_blocks_transacting() {
        let mut acct = Account::new(AccountNumber::parse("123456").unwrap(), Money::ZERO);
        acct.freeze();
        assert!(!acct.can_transact());
        acct.unfreeze();
        assert!(acct.can_transact());
    }

    #[test]
    fn test_status_string_round_trip() {
        assert_eq!(AccountStatus::parse("active"), Some(AccountStatus::Active));
        assert_eq!(AccountStatus::parse("frozen"), Some(AccountStatus::Frozen));
        assert_eq!(AccountStatus::parse("closed"), None);
        assert_eq!(AccountStatus::Frozen.as_str(), "frozen");
    }
}
