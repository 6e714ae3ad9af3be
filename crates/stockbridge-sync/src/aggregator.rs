//! # Multi-Source Stock Aggregator
//!
//! Merges per-warehouse stock rows from the inventory backend into
//! warehouse-tagged, normalized quantity records.
//!
//! ## Aggregation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stock Aggregation Flow                              │
//! │                                                                         │
//! │  for each configured warehouse route:                                   │
//! │                                                                         │
//! │    offset 0 ──► page ──► offset += rows ──► page ──► ... until a page  │
//! │                                                       is shorter than  │
//! │                                                       page_size        │
//! │    per row:                                                            │
//! │      empty article?          ──► drop                                  │
//! │      normalize article                                                 │
//! │      in ignore set?          ──► drop                                  │
//! │      quantity < 0?           ──► clamp to 0                            │
//! │      ──► StockFact { article, remote warehouse target, quantity }      │
//! │          + remember first-seen display name                            │
//! │                                                                         │
//! │  Output: StockSnapshot, rebuilt from scratch every cycle.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use tracing::{debug, info};

use stockbridge_core::{Article, StockFact, StockSnapshot};

use crate::config::WarehouseRoute;
use crate::error::SyncResult;
use crate::remote::InventoryBackend;

// =============================================================================
// Stock Aggregator
// =============================================================================

/// Pulls and normalizes the backend's stock reports for every configured
/// warehouse route.
pub struct StockAggregator<'a, B: InventoryBackend> {
    backend: &'a B,
    routes: &'a [WarehouseRoute],
    page_size: usize,
    ignore: &'a HashSet<Article>,
}

impl<'a, B: InventoryBackend> StockAggregator<'a, B> {
    pub fn new(
        backend: &'a B,
        routes: &'a [WarehouseRoute],
        page_size: usize,
        ignore: &'a HashSet<Article>,
    ) -> Self {
        StockAggregator {
            backend,
            routes,
            page_size,
            ignore,
        }
    }

    /// Collects one cycle's stock snapshot across all routes.
    ///
    /// Backend failures propagate: a stock cycle with half a snapshot is
    /// worse than a skipped cycle, since missing facts would read as
    /// zero stock downstream.
    pub async fn collect(&self) -> SyncResult<StockSnapshot> {
        let mut snapshot = StockSnapshot::default();
        let mut ignored = 0usize;
        let mut blank = 0usize;

        for route in self.routes {
            let mut offset = 0usize;

            loop {
                let rows = self
                    .backend
                    .stock_report_page(&route.local_id, offset, self.page_size)
                    .await?;
                let fetched = rows.len();

                debug!(
                    warehouse = %route.local_id,
                    offset,
                    fetched,
                    "stock report page"
                );

                for row in rows {
                    if row.article.trim().is_empty() {
                        blank += 1;
                        continue;
                    }

                    let article = Article::new(&row.article);
                    if self.ignore.contains(&article) {
                        ignored += 1;
                        continue;
                    }

                    // Backends report reserved stock as negatives; a
                    // marketplace only understands "how many can I sell".
                    let quantity = row.quantity.max(0) as u64;

                    snapshot.record(
                        StockFact {
                            article,
                            warehouse_target: route.remote_target.clone(),
                            quantity,
                        },
                        &row.name,
                    );
                }

                if fetched < self.page_size {
                    break;
                }
                offset += fetched;
            }
        }

        info!(
            facts = snapshot.len(),
            products = snapshot.articles().len(),
            warehouses = self.routes.len(),
            ignored,
            blank,
            "stock snapshot collected"
        );

        Ok(snapshot)
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

    use stockbridge_core::{
        LocalStatus, NewLocalOrder, OrderRef, ProductRef, ShipmentRef, StockRow,
    };

    use crate::error::SyncError;

    /// Backend stub serving scripted stock rows per warehouse; other
    /// operations are unreachable in these tests.
    struct StubBackend {
        rows: HashMap<String, Vec<StockRow>>,
        page_requests: Mutex<Vec<(String, usize, usize)>>,
    }

    impl StubBackend {
        fn new(rows: HashMap<String, Vec<StockRow>>) -> Self {
            StubBackend {
                rows,
                page_requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InventoryBackend for StubBackend {
        async fn find_product(&self, _article: &Article) -> SyncResult<Option<ProductRef>> {
            unreachable!("not used by the aggregator")
        }

        async fn stock_report_page(
            &self,
            warehouse_id: &str,
            offset: usize,
            limit: usize,
        ) -> SyncResult<Vec<StockRow>> {
            self.page_requests
                .lock()
                .unwrap()
                .push((warehouse_id.to_string(), offset, limit));
            let all = self
                .rows
                .get(warehouse_id)
                .ok_or_else(|| SyncError::UnexpectedPayload("unknown warehouse".into()))?;
            Ok(all.iter().skip(offset).take(limit).cloned().collect())
        }

        async fn find_order_by_name(&self, _name: &str) -> SyncResult<Option<OrderRef>> {
            unreachable!()
        }

        async fn create_order(&self, _order: &NewLocalOrder) -> SyncResult<OrderRef> {
            unreachable!()
        }

        async fn set_order_status(
            &self,
            _order: &OrderRef,
            _status: LocalStatus,
        ) -> SyncResult<()> {
            unreachable!()
        }

        async fn create_shipment(&self, _order: &OrderRef) -> SyncResult<ShipmentRef> {
            unreachable!()
        }
    }

    fn row(article: &str, name: &str, quantity: i64) -> StockRow {
        StockRow {
            article: article.to_string(),
            name: name.to_string(),
            quantity,
        }
    }

    fn route(local: &str, remote: &str) -> WarehouseRoute {
        WarehouseRoute {
            local_id: local.to_string(),
            remote_target: remote.to_string(),
        }
    }

    #[tokio::test]
    async fn filters_normalizes_and_clamps() {
        let backend = StubBackend::new(
            [(
                "wh-1".to_string(),
                vec![
                    row("А-01", "Mug", 5),       // Cyrillic А -> A-01
                    row("  ", "blank row", 9),   // dropped: empty article
                    row("SKIP-1", "Sample", 2),  // dropped: ignore set
                    row("B-02", "Plate", -3),    // clamped to 0
                ],
            )]
            .into(),
        );
        let routes = [route("wh-1", "221550")];
        let ignore: HashSet<Article> = [Article::new("SKIP-1")].into();

        let aggregator = StockAggregator::new(&backend, &routes, 100, &ignore);
        let snapshot = aggregator.collect().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.facts[0].article, Article::new("A-01"));
        assert_eq!(snapshot.facts[0].warehouse_target, "221550");
        assert_eq!(snapshot.facts[0].quantity, 5);
        assert_eq!(snapshot.facts[1].article, Article::new("B-02"));
        assert_eq!(snapshot.facts[1].quantity, 0);
        assert_eq!(snapshot.name_of(&Article::new("A-01")), Some("Mug"));
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let rows: Vec<StockRow> = (0..5).map(|i| row(&format!("A-{i}"), "P", 1)).collect();
        let backend = StubBackend::new([("wh-1".to_string(), rows)].into());
        let routes = [route("wh-1", "r1")];
        let ignore = HashSet::new();

        let aggregator = StockAggregator::new(&backend, &routes, 2, &ignore);
        let snapshot = aggregator.collect().await.unwrap();

        assert_eq!(snapshot.len(), 5);
        // Pages: offset 0 (2 rows), 2 (2 rows), 4 (1 row, short -> stop).
        let requests = backend.page_requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ("wh-1".to_string(), 0, 2),
                ("wh-1".to_string(), 2, 2),
                ("wh-1".to_string(), 4, 2),
            ]
        );
    }

    #[tokio::test]
    async fn exact_page_boundary_needs_one_empty_page() {
        let rows: Vec<StockRow> = (0..4).map(|i| row(&format!("A-{i}"), "P", 1)).collect();
        let backend = StubBackend::new([("wh-1".to_string(), rows)].into());
        let routes = [route("wh-1", "r1")];
        let ignore = HashSet::new();

        let aggregator = StockAggregator::new(&backend, &routes, 2, &ignore);
        let snapshot = aggregator.collect().await.unwrap();

        assert_eq!(snapshot.len(), 4);
        // The empty page at offset 4 is what terminates the loop.
        assert_eq!(backend.page_requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn walks_all_configured_warehouses() {
        let backend = StubBackend::new(
            [
                ("wh-1".to_string(), vec![row("A-01", "Mug", 1)]),
                ("wh-2".to_string(), vec![row("A-01", "Mug", 7)]),
            ]
            .into(),
        );
        let routes = [route("wh-1", "r1"), route("wh-2", "r2")];
        let ignore = HashSet::new();

        let aggregator = StockAggregator::new(&backend, &routes, 100, &ignore);
        let snapshot = aggregator.collect().await.unwrap();

        // One fact per warehouse, same canonical key.
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.articles().len(), 1);
        assert_eq!(snapshot.facts[0].warehouse_target, "r1");
        assert_eq!(snapshot.facts[1].warehouse_target, "r2");
    }

    #[tokio::test]
    async fn backend_failure_fails_the_collection() {
        let backend = StubBackend::new(HashMap::new());
        let routes = [route("wh-missing", "r1")];
        let ignore = HashSet::new();

        let aggregator = StockAggregator::new(&backend, &routes, 100, &ignore);
        assert!(aggregator.collect().await.is_err());
    }
}
