//! # Remote Capability Traits
//!
//! The seams between the engine and the outside world.
//!
//! ## Capability Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine ↔ World Boundaries                          │
//! │                                                                         │
//! │   Engine component          Capability trait         Real impl lives   │
//! │   ─────────────────         ────────────────         ───────────────   │
//! │   Aggregator, Reconciler ─► InventoryBackend    ─►   apps/syncd HTTP   │
//! │   RateLimitedClient      ─► Transport           ─►   apps/syncd HTTP   │
//! │   Orchestrator           ─► Marketplace         ─►   RestMarketplace   │
//! │   everything             ─► AlertSink/ReportSink ─►  report.rs impls   │
//! │                                                                         │
//! │   Tests wire mock impls against the same traits; the engine cannot     │
//! │   tell the difference.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The thin per-vendor HTTP wrappers behind [`Transport`] and
//! [`InventoryBackend`] are deliberately outside this crate: the engine
//! never knows which vendor sits on the other end.

use async_trait::async_trait;
use serde_json::Value;

use stockbridge_core::{
    Article, LocalStatus, NewLocalOrder, OrderRef, ProductRef, ShipmentRef,
    StockRow,
};

use crate::error::SyncResult;

// =============================================================================
// Raw Transport
// =============================================================================

/// A raw response from a remote API: status plus decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// One remote account's raw request channel - the thin per-vendor HTTP
/// wrapper.
///
/// Implementations map vendor-specific throttling signals (HTTP 429,
/// vendor error codes) to [`crate::SyncError::RateLimited`] and every other
/// error-class response to [`crate::SyncError::Api`] with the body carried
/// verbatim. They do NOT retry; retrying is the rate-limited client's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one outbound call against the remote API.
    async fn call(&self, operation: &str, body: &Value) -> SyncResult<ApiResponse>;
}

// =============================================================================
// Inventory Backend
// =============================================================================

/// The inventory/accounting backend: product catalog, stock reports, local
/// orders and shipments.
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// Looks up a catalog product by its canonical article key.
    async fn find_product(&self, article: &Article) -> SyncResult<Option<ProductRef>>;

    /// One page of the per-warehouse stock report. Offset-based: callers
    /// page until a response comes back shorter than `limit`.
    async fn stock_report_page(
        &self,
        warehouse_id: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<Vec<StockRow>>;

    /// Authoritative, synchronous-relative-to-create lookup of a local
    /// order by its deterministic name. This is what enforces the
    /// one-order-per-posting invariant; there is no uniqueness constraint
    /// on the backend side.
    async fn find_order_by_name(&self, name: &str) -> SyncResult<Option<OrderRef>>;

    /// Creates a local order with its full line set.
    async fn create_order(&self, order: &NewLocalOrder) -> SyncResult<OrderRef>;

    /// Applies a lifecycle status to an existing local order.
    async fn set_order_status(&self, order: &OrderRef, status: LocalStatus) -> SyncResult<()>;

    /// Creates a shipment/demand document against a local order.
    ///
    /// Contract: if the order already has a shipment, this is a
    /// backend-level no-op returning the existing document. The reconciler
    /// relies on this to keep repeated delivery-status cycles from
    /// duplicating shipments.
    async fn create_shipment(&self, order: &OrderRef) -> SyncResult<ShipmentRef>;
}
