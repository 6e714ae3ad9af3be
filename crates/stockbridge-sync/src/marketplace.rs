//! # Marketplace Capability
//!
//! Typed operations against one marketplace seller account, implemented on
//! top of the rate-limited client.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Marketplace Call Stack                              │
//! │                                                                         │
//! │   Orchestrator / Reconciler                                             │
//! │        │  typed methods (Posting, Presence, StockFact)                  │
//! │        ▼                                                                │
//! │   Marketplace trait ◄── RestMarketplace<T> (this module)                │
//! │        │  operation string + JSON payload                               │
//! │        ▼                                                                │
//! │   RateLimitedClient<T> (bounded retry on throttle)                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   Transport (thin per-vendor HTTP wrapper, apps/syncd)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every outbound call - listing postings, reading product states, pushing
//! stock - goes through the rate-limited client, so the backoff contract
//! holds uniformly.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use stockbridge_core::{Article, Posting, PostingLine, Presence, StockFact};

use crate::client::RateLimitedClient;
use crate::error::SyncResult;
use crate::remote::Transport;

// =============================================================================
// Operations
// =============================================================================

/// Vendor operation names, kept in one place so logs stay greppable.
pub mod ops {
    pub const POSTING_LIST: &str = "postings/list";
    pub const PRODUCT_STATES: &str = "products/states";
    pub const STOCK_UPDATE: &str = "stocks/update";
}

// =============================================================================
// Marketplace Trait
// =============================================================================

/// One marketplace seller account, as the engine sees it.
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Account label for logs, alerts and reports.
    fn account(&self) -> &str;

    /// Postings changed since `since`, one list call per status filter
    /// (no filters = one unfiltered call). A posting matching several
    /// filters appears several times here; deduplication is the fetch
    /// layer's job, not this one's.
    async fn list_postings_since(
        &self,
        since: DateTime<Utc>,
        status_filters: &[String],
    ) -> SyncResult<Vec<Posting>>;

    /// Presence state per article. Articles the account does not know are
    /// simply missing from the map (the eligibility filter defaults them
    /// to Absent).
    async fn product_states(
        &self,
        articles: &[Article],
    ) -> SyncResult<HashMap<Article, Presence>>;

    /// Publishes stock quantities. Subject to the rate-limited client
    /// contract; a terminal error here fails this account's push only.
    async fn push_stock(&self, facts: &[StockFact]) -> SyncResult<()>;
}

// =============================================================================
// Wire DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
struct PostingListResponse {
    #[serde(default)]
    postings: Vec<PostingDto>,
}

#[derive(Debug, Deserialize)]
struct PostingDto {
    posting_number: String,
    status: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    products: Vec<PostingProductDto>,
}

#[derive(Debug, Deserialize)]
struct PostingProductDto {
    offer_id: String,
    #[serde(default)]
    name: String,
    quantity: u64,
}

impl From<PostingDto> for Posting {
    fn from(dto: PostingDto) -> Self {
        Posting {
            number: dto.posting_number,
            status: dto.status,
            created_at: dto.created_at,
            lines: dto
                .products
                .into_iter()
                .map(|p| PostingLine {
                    article: p.offer_id,
                    name: p.name,
                    quantity: p.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductStatesResponse {
    #[serde(default)]
    items: Vec<ProductStateDto>,
}

#[derive(Debug, Deserialize)]
struct ProductStateDto {
    offer_id: String,
    #[serde(default)]
    state: Presence,
}

#[derive(Debug, Serialize)]
struct StockUpdateDto<'a> {
    offer_id: &'a str,
    warehouse_id: &'a str,
    stock: u64,
}

// =============================================================================
// REST Marketplace
// =============================================================================

/// Generic marketplace implementation over any [`Transport`].
pub struct RestMarketplace<T: Transport> {
    client: RateLimitedClient<T>,
}

impl<T: Transport> RestMarketplace<T> {
    pub fn new(client: RateLimitedClient<T>) -> Self {
        RestMarketplace { client }
    }
}

#[async_trait]
impl<T: Transport> Marketplace for RestMarketplace<T> {
    fn account(&self) -> &str {
        self.client.account()
    }

    async fn list_postings_since(
        &self,
        since: DateTime<Utc>,
        status_filters: &[String],
    ) -> SyncResult<Vec<Posting>> {
        let mut postings = Vec::new();

        // One call per filter so the vendor-side paging stays small; the
        // unfiltered shape is a single call with a null status.
        let filters: Vec<Option<&str>> = if status_filters.is_empty() {
            vec![None]
        } else {
            status_filters.iter().map(|s| Some(s.as_str())).collect()
        };

        for status in filters {
            let body = json!({
                "since": since.to_rfc3339(),
                "status": status,
            });
            let response = self.client.call(ops::POSTING_LIST, &body).await?;
            let parsed: PostingListResponse = serde_json::from_value(response.body)?;
            postings.extend(parsed.postings.into_iter().map(Posting::from));
        }

        Ok(postings)
    }

    async fn product_states(
        &self,
        articles: &[Article],
    ) -> SyncResult<HashMap<Article, Presence>> {
        let body = json!({
            "articles": articles.iter().map(Article::as_str).collect::<Vec<_>>(),
        });
        let response = self.client.call(ops::PRODUCT_STATES, &body).await?;
        let parsed: ProductStatesResponse = serde_json::from_value(response.body)?;

        // Keys reported by the vendor are normalized like everything else,
        // so a homoglyph-spelled listing still matches our canonical key.
        Ok(parsed
            .items
            .into_iter()
            .map(|item| (Article::new(&item.offer_id), item.state))
            .collect())
    }

    async fn push_stock(&self, facts: &[StockFact]) -> SyncResult<()> {
        let stocks: Vec<StockUpdateDto<'_>> = facts
            .iter()
            .map(|f| StockUpdateDto {
                offer_id: f.article.as_str(),
                warehouse_id: &f.warehouse_target,
                stock: f.quantity,
            })
            .collect();

        let body = json!({ "stocks": stocks });
        self.client.call(ops::STOCK_UPDATE, &body).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use crate::config::RetrySettings;
    use crate::remote::ApiResponse;
    use crate::report::AlertSink;

    struct NoOpAlerts;

    #[async_trait]
    impl AlertSink for NoOpAlerts {
        async fn notify(&self, _text: &str) {}
    }

    /// Transport that records every (operation, body) and replies from a
    /// canned response per operation.
    struct CannedTransport {
        calls: Mutex<Vec<(String, Value)>>,
        responses: HashMap<&'static str, Value>,
    }

    impl CannedTransport {
        fn new(responses: HashMap<&'static str, Value>) -> Self {
            CannedTransport {
                calls: Mutex::new(Vec::new()),
                responses,
            }
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn call(&self, operation: &str, body: &Value) -> SyncResult<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), body.clone()));
            Ok(ApiResponse {
                status: 200,
                body: self
                    .responses
                    .get(operation)
                    .cloned()
                    .unwrap_or_else(|| json!({})),
            })
        }
    }

    fn marketplace(
        responses: HashMap<&'static str, Value>,
    ) -> RestMarketplace<CannedTransport> {
        let client = RateLimitedClient::new(
            "main",
            CannedTransport::new(responses),
            RetrySettings::default(),
            Arc::new(NoOpAlerts),
        );
        RestMarketplace::new(client)
    }

    #[tokio::test]
    async fn postings_are_fetched_once_per_status_filter() {
        let response = json!({
            "postings": [{
                "posting_number": "ORD-1",
                "status": "delivering",
                "created_at": "2025-03-01T10:00:00Z",
                "products": [{"offer_id": "A-01", "name": "Mug", "quantity": 2}]
            }]
        });
        let mp = marketplace([(ops::POSTING_LIST, response)].into());

        let filters = vec!["awaiting_packaging".to_string(), "delivering".to_string()];
        let postings = mp
            .list_postings_since(Utc::now(), &filters)
            .await
            .unwrap();

        // Same canned posting under both filters: the trait reports both
        // occurrences and leaves dedup to the fetch layer.
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].number, "ORD-1");
        assert_eq!(postings[0].lines[0].article, "A-01");

        let calls = mp.client.transport().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1["status"], "awaiting_packaging");
        assert_eq!(calls[1].1["status"], "delivering");
    }

    #[tokio::test]
    async fn empty_filter_list_means_one_unfiltered_call() {
        let mp = marketplace([(ops::POSTING_LIST, json!({"postings": []}))].into());
        mp.list_postings_since(Utc::now(), &[]).await.unwrap();

        let calls = mp.client.transport().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["status"], Value::Null);
    }

    #[tokio::test]
    async fn product_states_normalize_vendor_keys() {
        let response = json!({
            "items": [
                {"offer_id": "А-01", "state": "active"},   // Cyrillic А
                {"offer_id": "B-02", "state": "archived"},
                {"offer_id": "C-03", "state": "moderating"} // unknown state
            ]
        });
        let mp = marketplace([(ops::PRODUCT_STATES, response)].into());

        let keys = [Article::new("A-01")];
        let states = mp.product_states(&keys).await.unwrap();

        assert_eq!(states[&Article::new("A-01")], Presence::Active);
        assert_eq!(states[&Article::new("B-02")], Presence::Archived);
        assert_eq!(states[&Article::new("C-03")], Presence::Absent);
    }

    #[tokio::test]
    async fn push_stock_serializes_facts() {
        let mp = marketplace([(ops::STOCK_UPDATE, json!({"result": "ok"}))].into());

        let facts = [StockFact {
            article: Article::new("A-01"),
            warehouse_target: "221550".to_string(),
            quantity: 5,
        }];
        mp.push_stock(&facts).await.unwrap();

        let calls = mp.client.transport().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1["stocks"][0],
            json!({"offer_id": "A-01", "warehouse_id": "221550", "stock": 5})
        );
    }
}
