//! TellerCore Common Types
//!
//! This crate contains shared types used across the TellerCore ledger,
//! including identifiers, the fixed-point money type, and the error taxonomy.

pub mod error;
pub mod identifiers;
pub mod money;
pub mod time;

pub use error::*;
pub use identifiers::*;
pub use money::*;
pub use time::*;
