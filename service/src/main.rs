//! TellerCore service binary.
//!
//! Hosts the ledger and time-deposit engines over the configured backing and
//! runs until interrupted.

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tellercore_service::{TellerConfig, TellerService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting TellerCore");

    let config = TellerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let service = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            info!("Connected to Postgres backing");
            TellerService::postgres(pool, &config).await?
        }
        None => {
            info!("Using in-memory backing");
            TellerService::in_memory(&config)
        }
    };

    if config.seed_demo_accounts {
        service.seed_demo_accounts().await?;
    }

    info!("TellerCore running");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    info!("TellerCore shutdown complete");
    Ok(())
}
