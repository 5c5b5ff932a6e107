//! TellerCore Ledger
//!
//! The canonical account ledger: a single `AccountStore` contract with
//! in-memory and relational backings, an append-only transaction journal,
//! and the `LedgerEngine` that applies deposits, withdrawals, and transfers
//! atomically per affected account set.

pub mod account;
pub mod engine;
pub mod journal;
pub mod locks;
pub mod postgres;
pub mod store;

pub use account::{Account, AccountStatus};
pub use engine::{BalanceSnapshot, LedgerConfig, LedgerEngine, TransactionReceipt, TransferReceipt};
pub use journal::{MemoryJournal, TransactionJournal, TransactionKind, TransactionRecord};
pub use locks::AccountLockTable;
pub use postgres::{PgAccountStore, PgJournal};
pub use store::{AccountStore, MemoryAccountStore};
