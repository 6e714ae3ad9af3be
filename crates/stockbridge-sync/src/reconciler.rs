//! # Order Reconciler
//!
//! Maps a remote posting into the local order representation with
//! idempotent create-or-update semantics.
//!
//! ## Reconciliation State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Per-Posting Reconciliation                            │
//! │                                                                         │
//! │  posting                                                                │
//! │     │                                                                   │
//! │     ▼ resolve EVERY line (normalize article -> catalog lookup)          │
//! │  any line unresolved? ──yes──► record ALL lines, reject order, stop    │
//! │     │ no                        (partial orders corrupt accounting)     │
//! │     ▼                                                                   │
//! │  lookup "PREFIX<number>"                                                │
//! │     ├─ absent  ──► create order (lines + mapped status + org refs)     │
//! │     └─ present ──► apply mapped status only                            │
//! │                    (unmapped vendor status = no-op;                     │
//! │                     lines are NEVER touched after creation)             │
//! │     │                                                                   │
//! │     ▼ mapped status triggers shipment?                                  │
//! │  create shipment; failure is reported, never rolled back, and          │
//! │  never re-enters the create path                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Idempotence rests on the authoritative name lookup: reconciling the
//! same posting twice yields one created order and at most one extra
//! status update, never a duplicate.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use stockbridge_core::{
    Article, LocalOrderLine, NewLocalOrder, OrgRefs, Posting, StatusMap,
    SyncErrorRecord,
};

use crate::error::SyncResult;
use crate::remote::InventoryBackend;
use crate::report::ReportSink;

// =============================================================================
// Fetch-Side Deduplication
// =============================================================================

/// Drops repeated posting numbers, keeping the first occurrence in fetch
/// order. A posting returned under several status filters must be
/// processed at most once per cycle; this is the fetch layer's guarantee,
/// enforced here before anything touches the backend.
pub fn dedupe_postings(postings: Vec<Posting>) -> Vec<Posting> {
    let mut seen = HashSet::new();
    postings
        .into_iter()
        .filter(|p| seen.insert(p.number.clone()))
        .collect()
}

// =============================================================================
// Reconcile Outcome
// =============================================================================

/// What reconciliation did to the local order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Local order created.
    Created,

    /// Existing order received a status transition.
    StatusApplied,

    /// Existing order left untouched (vendor status unmapped).
    Unchanged,

    /// Order rejected: at least one line did not resolve.
    Rejected,
}

/// Result of reconciling one posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Deterministic local order name.
    pub order_name: String,

    pub action: ReconcileAction,

    /// True when a shipment document was created this pass.
    pub shipment_created: bool,
}

// =============================================================================
// Order Reconciler
// =============================================================================

/// Reconciles remote postings into the inventory backend.
pub struct OrderReconciler<B: InventoryBackend> {
    backend: Arc<B>,
    reports: Arc<dyn ReportSink>,
    status_map: StatusMap,
    refs: OrgRefs,
    name_prefix: String,
}

impl<B: InventoryBackend> OrderReconciler<B> {
    pub fn new(
        backend: Arc<B>,
        reports: Arc<dyn ReportSink>,
        status_map: StatusMap,
        refs: OrgRefs,
        name_prefix: impl Into<String>,
    ) -> Self {
        OrderReconciler {
            backend,
            reports,
            status_map,
            refs,
            name_prefix: name_prefix.into(),
        }
    }

    /// The deterministic local name for a posting number.
    pub fn order_name(&self, posting_number: &str) -> String {
        format!("{}{}", self.name_prefix, posting_number)
    }

    /// Reconciles one posting.
    ///
    /// Backend errors (network, backend validation) propagate to the
    /// caller, which converts them into error records at order
    /// granularity - they must not abort the rest of the batch.
    pub async fn reconcile(&self, posting: &Posting) -> SyncResult<ReconcileOutcome> {
        let order_name = self.order_name(&posting.number);
        let mapped_status = self.status_map.map_vendor(&posting.status);

        // ---------------------------------------------------------------------
        // 1. Resolve every line before touching anything.
        // ---------------------------------------------------------------------
        let mut lines = Vec::with_capacity(posting.lines.len());
        let mut unresolved: Vec<Article> = Vec::new();

        for line in &posting.lines {
            let article = Article::new(&line.article);
            match self.backend.find_product(&article).await? {
                Some(product) => lines.push(LocalOrderLine {
                    product,
                    quantity: line.quantity,
                }),
                None => unresolved.push(article),
            }
        }

        if !unresolved.is_empty() {
            self.reject(posting, &unresolved).await;
            return Ok(ReconcileOutcome {
                order_name,
                action: ReconcileAction::Rejected,
                shipment_created: false,
            });
        }

        // ---------------------------------------------------------------------
        // 2. Idempotent upsert: authoritative lookup before create.
        // ---------------------------------------------------------------------
        let (order, action) = match self.backend.find_order_by_name(&order_name).await? {
            Some(existing) => {
                // The local order, once created, owns its contents; only
                // the lifecycle status follows the remote side.
                let action = match mapped_status {
                    Some(status) => {
                        self.backend.set_order_status(&existing, status).await?;
                        debug!(
                            order = %order_name,
                            status = %status,
                            "status transition applied"
                        );
                        ReconcileAction::StatusApplied
                    }
                    None => {
                        debug!(
                            order = %order_name,
                            vendor_status = %posting.status,
                            "vendor status unmapped, local order untouched"
                        );
                        ReconcileAction::Unchanged
                    }
                };
                (existing, action)
            }
            None => {
                let new_order = NewLocalOrder {
                    name: order_name.clone(),
                    status: mapped_status,
                    lines,
                    refs: self.refs.clone(),
                };
                let created = self.backend.create_order(&new_order).await?;
                info!(
                    order = %order_name,
                    posting = %posting.number,
                    lines = new_order.lines.len(),
                    "local order created"
                );
                (created, ReconcileAction::Created)
            }
        };

        // ---------------------------------------------------------------------
        // 3. Shipment trigger: independent of order existence.
        // ---------------------------------------------------------------------
        let mut shipment_created = false;
        if mapped_status.is_some_and(|s| s.triggers_shipment()) {
            match self.backend.create_shipment(&order).await {
                Ok(shipment) => {
                    shipment_created = true;
                    debug!(order = %order_name, shipment = %shipment.id, "shipment ensured");
                }
                Err(err) => {
                    // Order existence and shipment existence are
                    // independent facts; the order stays as created.
                    warn!(order = %order_name, error = %err, "shipment creation failed");
                    self.reports
                        .append_errors(&[SyncErrorRecord::new(
                            Utc::now(),
                            &posting.number,
                            "",
                            "",
                            format!("shipment creation failed: {err}"),
                        )])
                        .await;
                }
            }
        }

        Ok(ReconcileOutcome {
            order_name,
            action,
            shipment_created,
        })
    }

    /// Records the rejection of a whole order: one row per line, so the
    /// report shows the full blast radius, not just the broken line.
    async fn reject(&self, posting: &Posting, unresolved: &[Article]) {
        let unresolved_set: HashSet<&Article> = unresolved.iter().collect();
        let first_missing = &unresolved[0];
        let now = Utc::now();

        let rows: Vec<SyncErrorRecord> = posting
            .lines
            .iter()
            .map(|line| {
                let article = Article::new(&line.article);
                let reason = if unresolved_set.contains(&article) {
                    format!("no catalog product for article '{article}'")
                } else {
                    format!(
                        "order rejected: sibling line '{first_missing}' could not be resolved"
                    )
                };
                SyncErrorRecord::new(now, &posting.number, article.as_str(), &line.name, reason)
            })
            .collect();

        warn!(
            posting = %posting.number,
            lines = posting.lines.len(),
            unresolved = unresolved.len(),
            "posting rejected: unresolved line items"
        );
        self.reports.append_errors(&rows).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use stockbridge_core::{
        LocalStatus, OrderRef, PostingLine, ProductRef, ShipmentRef, StockRow,
    };

    use crate::error::{SyncError, SyncResult};
    use crate::report::PushPlan;

    // -------------------------------------------------------------------------
    // Mocks
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct MockBackend {
        products: HashMap<Article, ProductRef>,
        orders: Mutex<HashMap<String, OrderRef>>,
        creates: Mutex<Vec<NewLocalOrder>>,
        status_calls: Mutex<Vec<(String, LocalStatus)>>,
        shipments: Mutex<Vec<String>>,
        fail_shipments: bool,
    }

    impl MockBackend {
        fn with_product(mut self, article: &str, id: &str, name: &str) -> Self {
            self.products.insert(
                Article::new(article),
                ProductRef {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
            self
        }

        fn failing_shipments(mut self) -> Self {
            self.fail_shipments = true;
            self
        }
    }

    #[async_trait]
    impl InventoryBackend for MockBackend {
        async fn find_product(&self, article: &Article) -> SyncResult<Option<ProductRef>> {
            Ok(self.products.get(article).cloned())
        }

        async fn stock_report_page(
            &self,
            _warehouse_id: &str,
            _offset: usize,
            _limit: usize,
        ) -> SyncResult<Vec<StockRow>> {
            unreachable!("not used by the reconciler")
        }

        async fn find_order_by_name(&self, name: &str) -> SyncResult<Option<OrderRef>> {
            Ok(self.orders.lock().unwrap().get(name).cloned())
        }

        async fn create_order(&self, order: &NewLocalOrder) -> SyncResult<OrderRef> {
            self.creates.lock().unwrap().push(order.clone());
            let order_ref = OrderRef {
                id: format!("id-{}", order.name),
                name: order.name.clone(),
            };
            self.orders
                .lock()
                .unwrap()
                .insert(order.name.clone(), order_ref.clone());
            Ok(order_ref)
        }

        async fn set_order_status(
            &self,
            order: &OrderRef,
            status: LocalStatus,
        ) -> SyncResult<()> {
            self.status_calls
                .lock()
                .unwrap()
                .push((order.name.clone(), status));
            Ok(())
        }

        async fn create_shipment(&self, order: &OrderRef) -> SyncResult<ShipmentRef> {
            if self.fail_shipments {
                return Err(SyncError::Api {
                    operation: "shipments/create".into(),
                    status: 500,
                    body: "shipment service down".into(),
                });
            }
            self.shipments.lock().unwrap().push(order.name.clone());
            Ok(ShipmentRef {
                id: format!("ship-{}", order.name),
            })
        }
    }

    #[derive(Default)]
    struct RecordingReports {
        errors: Mutex<Vec<SyncErrorRecord>>,
    }

    #[async_trait]
    impl ReportSink for RecordingReports {
        async fn append_errors(&self, rows: &[SyncErrorRecord]) {
            self.errors.lock().unwrap().extend_from_slice(rows);
        }

        async fn emit_push_plan(&self, _plan: &PushPlan) {}
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn status_map() -> StatusMap {
        StatusMap::from_pairs([
            ("awaiting_packaging".to_string(), LocalStatus::AwaitingShipment),
            ("delivering".to_string(), LocalStatus::InDelivery),
            ("delivered".to_string(), LocalStatus::Delivered),
        ])
    }

    fn refs() -> OrgRefs {
        OrgRefs {
            organization: "org-1".into(),
            counterparty: "cp-1".into(),
            warehouse: "wh-1".into(),
        }
    }

    fn posting(number: &str, status: &str, lines: &[(&str, &str, u64)]) -> Posting {
        Posting {
            number: number.to_string(),
            status: status.to_string(),
            created_at: Utc::now(),
            lines: lines
                .iter()
                .map(|(article, name, quantity)| PostingLine {
                    article: article.to_string(),
                    name: name.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    fn reconciler(
        backend: MockBackend,
    ) -> (OrderReconciler<MockBackend>, Arc<RecordingReports>) {
        let reports = Arc::new(RecordingReports::default());
        let reconciler = OrderReconciler::new(
            Arc::new(backend),
            reports.clone(),
            status_map(),
            refs(),
            "MP-",
        );
        (reconciler, reports)
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[test]
    fn dedupe_keeps_first_occurrence_in_fetch_order() {
        let postings = vec![
            posting("ORD-1", "awaiting_packaging", &[]),
            posting("ORD-2", "delivering", &[]),
            posting("ORD-1", "delivering", &[]),
        ];
        let deduped = dedupe_postings(postings);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].number, "ORD-1");
        assert_eq!(deduped[0].status, "awaiting_packaging");
        assert_eq!(deduped[1].number, "ORD-2");
    }

    #[tokio::test]
    async fn creates_order_once_then_only_updates_status() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, _reports) = reconciler(backend);
        let p = posting("ORD-1", "awaiting_packaging", &[("A-01", "Mug", 2)]);

        let first = reconciler.reconcile(&p).await.unwrap();
        assert_eq!(first.action, ReconcileAction::Created);

        let second = reconciler.reconcile(&p).await.unwrap();
        assert_eq!(second.action, ReconcileAction::StatusApplied);

        let backend = &reconciler.backend;
        assert_eq!(backend.creates.lock().unwrap().len(), 1);
        assert_eq!(backend.orders.lock().unwrap().len(), 1);
        assert_eq!(backend.status_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn created_order_carries_status_lines_and_refs() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, _reports) = reconciler(backend);
        let p = posting("ORD-1", "awaiting_packaging", &[("А-01", "Mug", 2)]); // Cyrillic А

        reconciler.reconcile(&p).await.unwrap();

        let creates = reconciler.backend.creates.lock().unwrap();
        let order = &creates[0];
        assert_eq!(order.name, "MP-ORD-1");
        assert_eq!(order.status, Some(LocalStatus::AwaitingShipment));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].product.id, "p1");
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.refs, refs());
    }

    #[tokio::test]
    async fn one_unresolvable_line_rejects_the_whole_order() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, reports) = reconciler(backend);
        let p = posting(
            "ORD-1",
            "awaiting_packaging",
            &[("A-01", "Mug", 1), ("GHOST-9", "Ghost", 3)],
        );

        let outcome = reconciler.reconcile(&p).await.unwrap();
        assert_eq!(outcome.action, ReconcileAction::Rejected);

        // Zero local orders...
        assert!(reconciler.backend.creates.lock().unwrap().is_empty());

        // ...and records covering ALL lines, not just the broken one.
        let errors = reports.errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|r| r.order_number == "ORD-1"));
        assert!(errors
            .iter()
            .any(|r| r.article == "GHOST-9" && r.reason.contains("no catalog product")));
        assert!(errors
            .iter()
            .any(|r| r.article == "A-01" && r.reason.contains("GHOST-9")));
    }

    #[tokio::test]
    async fn unmapped_vendor_status_is_a_noop_on_existing_orders() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, _reports) = reconciler(backend);
        let created = posting("ORD-1", "awaiting_packaging", &[("A-01", "Mug", 1)]);
        reconciler.reconcile(&created).await.unwrap();

        let arbitration = posting("ORD-1", "arbitration", &[("A-01", "Mug", 1)]);
        let outcome = reconciler.reconcile(&arbitration).await.unwrap();

        assert_eq!(outcome.action, ReconcileAction::Unchanged);
        assert!(reconciler.backend.status_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_status_triggers_shipment() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, _reports) = reconciler(backend);
        let p = posting("ORD-1", "delivering", &[("A-01", "Mug", 1)]);

        let outcome = reconciler.reconcile(&p).await.unwrap();

        assert_eq!(outcome.action, ReconcileAction::Created);
        assert!(outcome.shipment_created);
        assert_eq!(
            reconciler.backend.shipments.lock().unwrap().as_slice(),
            ["MP-ORD-1"]
        );
    }

    #[tokio::test]
    async fn pre_delivery_status_creates_no_shipment() {
        let backend = MockBackend::default().with_product("A-01", "p1", "Mug");
        let (reconciler, _reports) = reconciler(backend);
        let p = posting("ORD-1", "awaiting_packaging", &[("A-01", "Mug", 1)]);

        let outcome = reconciler.reconcile(&p).await.unwrap();
        assert!(!outcome.shipment_created);
        assert!(reconciler.backend.shipments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shipment_failure_keeps_the_order_and_is_reported() {
        let backend = MockBackend::default()
            .with_product("A-01", "p1", "Mug")
            .failing_shipments();
        let (reconciler, reports) = reconciler(backend);
        let p = posting("ORD-1", "delivering", &[("A-01", "Mug", 1)]);

        let outcome = reconciler.reconcile(&p).await.unwrap();
        assert_eq!(outcome.action, ReconcileAction::Created);
        assert!(!outcome.shipment_created);

        // The order exists; the failure produced a record, not a rollback.
        assert_eq!(reconciler.backend.creates.lock().unwrap().len(), 1);
        let errors = reports.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].reason.contains("shipment creation failed"));

        // And a retry does not re-enter the create path.
        drop(errors);
        let retry = reconciler.reconcile(&p).await.unwrap();
        assert_ne!(retry.action, ReconcileAction::Created);
        assert_eq!(reconciler.backend.creates.lock().unwrap().len(), 1);
    }
}
