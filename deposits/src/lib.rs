//! TellerCore Time Deposits
//!
//! Fixed-term deposits: principal is locked out of the owning account at
//! creation and credited back with interest at maturity. Rates come from a
//! fixed duration tier table; interest math is exact decimal arithmetic.

pub mod deposit;
pub mod engine;
pub mod postgres;
pub mod rates;
pub mod store;

pub use deposit::{DepositStatus, MaturityWindow, TimeDeposit};
pub use engine::{DepositConfig, TimeDepositEngine};
pub use postgres::PgDepositStore;
pub use rates::{annual_rate_for, interest_for};
pub use store::{DepositStore, MemoryDepositStore};
