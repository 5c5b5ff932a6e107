//! Service configuration.

use std::time::Duration;

use tellercore_common::time::constants::default_lock_timeout;

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct TellerConfig {
    /// Postgres connection URL. `None` selects the in-memory backing.
    pub database_url: Option<String>,
    /// Upper bound on account lock acquisition per operation.
    pub lock_timeout: Duration,
    /// Seed the demonstration accounts at startup.
    pub seed_demo_accounts: bool,
    /// Log level.
    pub log_level: String,
}

impl Default for TellerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            lock_timeout: default_lock_timeout(),
            seed_demo_accounts: true,
            log_level: "info".to_string(),
        }
    }
}

impl TellerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TELLER_DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = Some(url);
            }
        }

        if let Ok(ms) = std::env::var("TELLER_LOCK_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.lock_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(seed) = std::env::var("TELLER_SEED_DEMO_ACCOUNTS") {
            config.seed_demo_accounts = matches!(seed.as_str(), "1" | "true" | "yes");
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("Lock timeout cannot be zero".to_string());
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(format!("Unsupported database URL scheme: {url}"));
            }
        }

        Ok(())
    }
}
