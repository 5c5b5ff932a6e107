//! Time utilities and ledger timing constants.

use chrono::{DateTime, Duration, Utc};

/// A timestamp with timezone (always UTC for TellerCore).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Ledger timing constants.
pub mod constants {
    use super::Duration;

    /// Deterministic month approximation used for maturity dates (30 days).
    pub fn month_window() -> Duration {
        Duration::days(30)
    }

    /// Accelerated maturity window for automated tests (1 second).
    pub fn accelerated_window() -> Duration {
        Duration::seconds(1)
    }

    /// Default account lock acquisition timeout (5 seconds).
    pub fn default_lock_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }

    /// Suggested client retry delay after a `Busy` rejection (100ms).
    pub const BUSY_RETRY_AFTER_MS: u64 = 100;
}
