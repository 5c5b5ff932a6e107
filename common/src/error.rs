//! Error taxonomy for TellerCore operations.
//!
//! Business-rule failures are distinguished by variant, never by matching on
//! message text. Every validation error is raised before any store mutation.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::identifiers::{AccountNumber, DepositId};
use crate::money::Money;
use crate::time::Timestamp;

/// Main error type for ledger and time-deposit operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TellerError {
    /// Account does not exist.
    #[error("Account {0} not found")]
    AccountNotFound(AccountNumber),

    /// Malformed account number (must be exactly 6 ASCII digits).
    #[error("Invalid account number: {0:?}")]
    InvalidAccountNumber(String),

    /// Account creation attempted with a number already in use.
    #[error("Account {0} already exists")]
    AccountExists(AccountNumber),

    /// Account is frozen; no transactions allowed.
    #[error("Account {0} is frozen")]
    AccountFrozen(AccountNumber),

    /// Withdrawal or transfer exceeds the available balance.
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountNumber,
        balance: Money,
        requested: Money,
    },

    /// Amount failed validation before any store access.
    #[error("Invalid amount {value}: {reason}")]
    InvalidAmount { value: String, reason: &'static str },

    /// Deposit would push the balance over the account ceiling.
    #[error("Deposit would exceed the balance limit for account {account}: balance {balance}, requested {requested}")]
    LimitExceeded {
        account: AccountNumber,
        balance: Money,
        requested: Money,
    },

    /// Sender and recipient are the same account.
    #[error("Sender and recipient accounts must differ")]
    SameAccount,

    /// Time-deposit duration outside 1..=60 months.
    #[error("Invalid duration: {0} months (must be 1-60)")]
    InvalidDuration(u32),

    /// Time deposit does not exist.
    #[error("Time deposit {0} not found")]
    DepositNotFound(DepositId),

    /// Time deposit was already matured.
    #[error("Time deposit {0} already matured")]
    AlreadyMatured(DepositId),

    /// Time deposit has not reached its maturity date.
    #[error("Time deposit {deposit_id} not mature until {maturity_at}")]
    NotYetMature {
        deposit_id: DepositId,
        maturity_at: Timestamp,
    },

    /// Account lock acquisition timed out; safe to retry.
    #[error("Ledger busy, retry after {retry_after_ms}ms")]
    Busy { retry_after_ms: u64 },

    /// Backing store failed; fatal, surfaced as-is.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl TellerError {
    /// Build an `InvalidAmount` from the offending decimal input.
    pub fn invalid_amount(value: Decimal, reason: &'static str) -> Self {
        TellerError::InvalidAmount {
            value: value.to_string(),
            reason,
        }
    }

    /// Check if this error is retryable with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TellerError::Busy { .. })
    }

    /// Get a stable error code for the transport layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            TellerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TellerError::InvalidAccountNumber(_) => "INVALID_ACCOUNT_NUMBER",
            TellerError::AccountExists(_) => "ACCOUNT_EXISTS",
            TellerError::AccountFrozen(_) => "ACCOUNT_FROZEN",
            TellerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TellerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            TellerError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            TellerError::SameAccount => "SAME_ACCOUNT",
            TellerError::InvalidDuration(_) => "INVALID_DURATION",
            TellerError::DepositNotFound(_) => "DEPOSIT_NOT_FOUND",
            TellerError::AlreadyMatured(_) => "ALREADY_MATURED",
            TellerError::NotYetMature { .. } => "NOT_YET_MATURE",
            TellerError::Busy { .. } => "BUSY",
            TellerError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}

/// Result type alias for TellerCore operations.
pub type Result<T> = std::result::Result<T, TellerError>;
