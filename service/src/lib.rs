//! TellerCore Service
//!
//! Wires the ledger and time-deposit engines over a shared account store and
//! lock table, selects the storage backing from configuration, and seeds the
//! demonstration data set.

pub mod config;
pub mod service;

pub use config::TellerConfig;
pub use service::{TellerService, DEMO_ACCOUNTS};
