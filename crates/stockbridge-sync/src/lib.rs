//! # stockbridge-sync: Reconciliation Engine for Stockbridge
//!
//! This crate keeps inventory counts and sales orders consistent across an
//! inventory/accounting backend and N independent marketplace seller
//! accounts, by polling each side and pushing reconciled deltas.
//!
//! ## Engine Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Engine                               │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 SyncOrchestrator (two cadences)                  │  │
//! │  └──────┬──────────────────────────────────────────┬────────────────┘  │
//! │         │ orders (short interval)                  │ stock (long)      │
//! │         ▼                                          ▼                   │
//! │  ┌────────────────┐                        ┌────────────────────────┐  │
//! │  │ OrderReconciler│                        │ StockAggregator        │  │
//! │  │                │                        │                        │  │
//! │  │ fetch → dedupe │                        │ paged reports →        │  │
//! │  │ → resolve →    │                        │ normalize → ignore →   │  │
//! │  │ idempotent     │                        │ clamp → snapshot       │  │
//! │  │ upsert →       │                        └───────────┬────────────┘  │
//! │  │ shipment       │                                    ▼               │
//! │  └───────┬────────┘                        ┌────────────────────────┐  │
//! │          │                                 │ compute_eligibility    │  │
//! │          ▼                                 │ (stockbridge-core)     │  │
//! │  ┌────────────────┐                        └───────────┬────────────┘  │
//! │  │ InventoryBackend│ ◄── capability traits ──►         ▼               │
//! │  │ (catalog,orders)│            ┌──────────────────────────────────┐   │
//! │  └────────────────┘             │ Marketplace (RestMarketplace     │   │
//! │                                 │  over RateLimitedClient)         │   │
//! │                                 └──────────────────────────────────┘   │
//! │                                                                         │
//! │  OUTPUTS: append-only CSV reports (ReportSink) + operator alerts       │
//! │           (AlertSink). The engine owns no other durable state.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`aggregator`] - Multi-warehouse stock aggregation
//! - [`client`] - Rate-limited request client (bounded linear backoff)
//! - [`config`] - TOML + env configuration, validated at startup
//! - [`error`] - Engine error taxonomy
//! - [`marketplace`] - Marketplace capability and its REST implementation
//! - [`orchestrator`] - The two sync cadences
//! - [`reconciler`] - Idempotent posting-to-order reconciliation
//! - [`remote`] - Transport and inventory-backend capability traits
//! - [`report`] - Report/alert sinks (append-only CSV, tracing alerts)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockbridge_sync::{
//!     CsvReportSink, LogAlertSink, SyncConfig, SyncOrchestrator,
//! };
//!
//! let config = Arc::new(SyncConfig::load(Some(path))?);
//! let reports = Arc::new(CsvReportSink::new(
//!     &config.report.error_csv,
//!     &config.report.plan_csv,
//! ));
//! let orchestrator = SyncOrchestrator::new(
//!     config.clone(),
//!     backend,    // impl InventoryBackend (thin HTTP wrapper)
//!     accounts,   // Vec<Arc<dyn Marketplace>>
//!     Arc::new(LogAlertSink),
//!     reports,
//! )?;
//!
//! // Driven externally at two independent intervals:
//! orchestrator.run_order_cycle().await;
//! orchestrator.run_stock_cycle().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod orchestrator;
pub mod reconciler;
pub mod remote;
pub mod report;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregator::StockAggregator;
pub use client::RateLimitedClient;
pub use config::{RetrySettings, SyncConfig, WarehouseRoute};
pub use error::{SyncError, SyncResult};
pub use marketplace::{Marketplace, RestMarketplace};
pub use orchestrator::{OrderCycleSummary, StockCycleSummary, SyncOrchestrator};
pub use reconciler::{
    dedupe_postings, OrderReconciler, ReconcileAction, ReconcileOutcome,
};
pub use remote::{ApiResponse, InventoryBackend, Transport};
pub use report::{
    AlertSink, CsvReportSink, LogAlertSink, PushPlan, PushPlanEntry, ReportSink,
};
