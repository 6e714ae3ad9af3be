//! # Stockbridge Sync Daemon
//!
//! Wires the reconciliation engine to the real world and drives the two
//! cadences on their configured intervals.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          syncd Startup                                  │
//! │                                                                         │
//! │  tracing init ──► config load (argv / BRIDGE_CONFIG / default path)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP wrappers (backend + one transport per account)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncOrchestrator ──► two interval loops ──► ctrl-c shutdown           │
//! │     orders: short interval     stock: long interval                     │
//! │     (a cycle always finishes before its next tick fires)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stockbridge_sync::{
    CsvReportSink, LogAlertSink, Marketplace, RateLimitedClient, RestMarketplace,
    SyncConfig, SyncOrchestrator,
};

use crate::http::{HttpBackend, HttpTransport};

/// Resolves the config path: argv beats `BRIDGE_CONFIG` beats the default.
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BRIDGE_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("stockbridge.toml"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("starting stockbridge syncd");

    // Load configuration; anything invalid aborts startup here.
    let path = config_path();
    let config = Arc::new(SyncConfig::load(Some(path.as_path()))?);
    info!(
        accounts = config.accounts.len(),
        warehouses = config.stock.warehouses.len(),
        dry_run = config.stock.dry_run,
        "configuration loaded"
    );

    // Sinks
    let alerts = Arc::new(LogAlertSink);
    let reports = Arc::new(CsvReportSink::new(
        &config.report.error_csv,
        &config.report.plan_csv,
    ));

    // Thin HTTP wrappers
    let backend = Arc::new(HttpBackend::new(
        config.backend.base_url.clone(),
        config.backend.token.clone(),
    ));

    let accounts: Vec<Arc<dyn Marketplace>> = config
        .accounts
        .iter()
        .map(|account| {
            let transport = HttpTransport::new(
                account.api_url.clone(),
                account.client_id.clone(),
                account.api_key.clone(),
            );
            let client = RateLimitedClient::new(
                account.name.clone(),
                transport,
                config.retry,
                alerts.clone(),
            );
            Arc::new(RestMarketplace::new(client)) as Arc<dyn Marketplace>
        })
        .collect();

    let orchestrator = Arc::new(SyncOrchestrator::new(
        config.clone(),
        backend,
        accounts,
        alerts,
        reports,
    )?);

    // Order cadence: short interval. MissedTickBehavior::Delay guarantees a
    // cycle completes before the next trigger fires - no overlapping cycles
    // within a cadence.
    let order_orchestrator = orchestrator.clone();
    let order_interval = Duration::from_secs(config.orders.poll_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(order_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let summary = order_orchestrator.run_order_cycle().await;
            info!(?summary, "order cycle complete");
        }
    });

    // Stock cadence: long interval, same no-overlap guarantee.
    let stock_orchestrator = orchestrator.clone();
    let stock_interval = Duration::from_secs(config.stock.poll_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(stock_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match stock_orchestrator.run_stock_cycle().await {
                Ok(summary) => info!(?summary, "stock cycle complete"),
                Err(err) => error!(error = %err, "stock cycle failed"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping");
    Ok(())
}
