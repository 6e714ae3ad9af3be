//! Thin per-vendor HTTP wrappers.
//!
//! Nothing in here retries, decides, or reconciles: these types translate
//! between the engine's capability traits and the vendors' HTTP surfaces,
//! and map vendor error shapes onto the engine's error taxonomy.
//!
//! - HTTP 429 → [`SyncError::RateLimited`] (the rate-limited client retries)
//! - other error statuses → [`SyncError::Api`] with the body verbatim
//! - connect/timeout failures → [`SyncError::Network`]

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use stockbridge_core::{
    Article, LocalStatus, NewLocalOrder, OrderRef, ProductRef, ShipmentRef,
    StockRow,
};
use stockbridge_sync::{ApiResponse, InventoryBackend, SyncError, SyncResult, Transport};

// =============================================================================
// Shared plumbing
// =============================================================================

fn network_err(operation: &str, err: reqwest::Error) -> SyncError {
    SyncError::Network {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

/// Decodes a reqwest response into the engine's error taxonomy.
async fn decode(operation: &str, response: reqwest::Response) -> SyncResult<ApiResponse> {
    let status = response.status();

    if status.as_u16() == 429 {
        return Err(SyncError::RateLimited {
            operation: operation.to_string(),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| network_err(operation, e))?;

    if !status.is_success() {
        return Err(SyncError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    let body: Value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)?
    };

    Ok(ApiResponse {
        status: status.as_u16(),
        body,
    })
}

// =============================================================================
// Marketplace transport
// =============================================================================

/// Raw request channel for one marketplace seller account.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, operation: &str, body: &Value) -> SyncResult<ApiResponse> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), operation);
        let response = self
            .client
            .post(&url)
            .header("Client-Id", &self.client_id)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| network_err(operation, e))?;

        decode(operation, response).await
    }
}

// =============================================================================
// Inventory backend
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Rows<T> {
    #[serde(default)]
    rows: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EntityDto {
    id: String,
    #[serde(default)]
    name: String,
}

/// HTTP implementation of the inventory/accounting backend capability.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        HttpBackend {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    async fn get(&self, operation: &str, path: &str) -> SyncResult<ApiResponse> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| network_err(operation, e))?;
        decode(operation, response).await
    }

    async fn post(&self, operation: &str, path: &str, body: &Value) -> SyncResult<ApiResponse> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| network_err(operation, e))?;
        decode(operation, response).await
    }
}

#[async_trait]
impl InventoryBackend for HttpBackend {
    async fn find_product(&self, article: &Article) -> SyncResult<Option<ProductRef>> {
        let response = self
            .get(
                "products/find",
                &format!("entity/product?article={}", article.as_str()),
            )
            .await?;
        let parsed: Rows<EntityDto> = serde_json::from_value(response.body)?;
        Ok(parsed.rows.into_iter().next().map(|row| ProductRef {
            id: row.id,
            name: row.name,
        }))
    }

    async fn stock_report_page(
        &self,
        warehouse_id: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<Vec<StockRow>> {
        let response = self
            .get(
                "stock/report",
                &format!("report/stock/bystore?store={warehouse_id}&offset={offset}&limit={limit}"),
            )
            .await?;
        let parsed: Rows<StockRow> = serde_json::from_value(response.body)?;
        Ok(parsed.rows)
    }

    async fn find_order_by_name(&self, name: &str) -> SyncResult<Option<OrderRef>> {
        let response = self
            .get(
                "orders/find",
                &format!("entity/customerorder?name={name}"),
            )
            .await?;
        let parsed: Rows<EntityDto> = serde_json::from_value(response.body)?;
        Ok(parsed.rows.into_iter().next().map(|row| OrderRef {
            id: row.id,
            name: row.name,
        }))
    }

    async fn create_order(&self, order: &NewLocalOrder) -> SyncResult<OrderRef> {
        let body = json!({
            "name": order.name,
            "organization": order.refs.organization,
            "agent": order.refs.counterparty,
            "store": order.refs.warehouse,
            "state": order.status.map(|s| s.to_string()),
            "positions": order.lines.iter().map(|line| json!({
                "assortment": line.product.id,
                "quantity": line.quantity,
            })).collect::<Vec<_>>(),
        });
        let response = self
            .post("orders/create", "entity/customerorder", &body)
            .await?;
        let created: EntityDto = serde_json::from_value(response.body)?;
        Ok(OrderRef {
            id: created.id,
            name: order.name.clone(),
        })
    }

    async fn set_order_status(&self, order: &OrderRef, status: LocalStatus) -> SyncResult<()> {
        let body = json!({ "state": status.to_string() });
        self.post(
            "orders/set_status",
            &format!("entity/customerorder/{}", order.id),
            &body,
        )
        .await?;
        Ok(())
    }

    async fn create_shipment(&self, order: &OrderRef) -> SyncResult<ShipmentRef> {
        let body = json!({ "customerOrder": order.id });
        let response = self.post("shipments/create", "entity/demand", &body).await?;
        let created: EntityDto = serde_json::from_value(response.body)?;
        Ok(ShipmentRef { id: created.id })
    }
}
