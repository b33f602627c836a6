use anyhow::Context;
use database::{Db, PoolState};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for borrowed connections to come home before
/// giving up and exiting with an error.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the background task sweeps expired open trades out of the
/// trades table. Listings filter on expiration anyway, so the interval
/// only bounds how long dead rows linger.
const TRADE_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = configuration::load_settings()?;

    // The pool handle is built exactly once, before the server accepts
    // requests, and passed explicitly to everything that needs it.
    let db = Db::connect(&settings.database).await?;
    if db.state() == PoolState::Degraded {
        tracing::warn!("Starting with a degraded database pool; all queries will fail fast.");
    }
    let repo = database::Repository::new(db.clone(), settings.tables.clone());

    let sweeper = repo.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TRADE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match sweeper.delete_expired_trades().await {
                Ok(0) => {}
                Ok(swept) => tracing::info!(swept, "Deleted expired trades."),
                Err(sweep_err) => {
                    tracing::error!(error = %sweep_err, "Expired-trade sweep failed.");
                }
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server bind address")?;

    web_server::run_server(addr, repo, shutdown_signal()).await?;

    // A pool that will not drain means connections are still borrowed;
    // that is a bug worth dying loudly over, not a log line.
    tracing::info!("Draining the database connection pool.");
    db.close(DRAIN_TIMEOUT)
        .await
        .context("database pool failed to drain before shutdown")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(signal_err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %signal_err, "Failed to listen for the interrupt signal.");
    }
    tracing::info!("Interrupt received; shutting down.");
}
