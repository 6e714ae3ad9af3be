//! # Sync Configuration
//!
//! Configuration management for the reconciliation engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BRIDGE_BACKEND_URL=https://backend.example.com/api                 │
//! │     BRIDGE_BACKEND_TOKEN=...                                           │
//! │     BRIDGE_DRY_RUN=true                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path from argv / BRIDGE_CONFIG / ./stockbridge.toml                │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     intervals, page size, retry budget                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loaded [`SyncConfig`] is immutable and passed explicitly into every
//! component constructor. Core logic never reads configuration ambiently.
//!
//! ## Configuration File Format
//! ```toml
//! [backend]
//! base_url = "https://backend.example.com/api"
//! token = "..."
//! page_size = 1000
//!
//! [org]
//! organization = "org-f3a1"
//! counterparty = "cp-9c2e"
//! warehouse = "wh-main"
//!
//! [[accounts]]
//! name = "main"
//! api_url = "https://api.seller.example.com/v1"
//! client_id = "12345"
//! api_key = "..."
//!
//! [[accounts]]
//! name = "second"
//! api_url = "https://api.seller.example.com/v1"
//! client_id = "67890"
//! api_key = "..."
//!
//! [orders]
//! poll_interval_secs = 120
//! lookback_hours = 24
//! cutoff_date = "2024-01-01"
//! status_filters = ["awaiting_packaging", "awaiting_deliver", "delivering", "delivered", "cancelled"]
//! order_name_prefix = "MP-"
//!
//! [orders.status_map]
//! awaiting_packaging = "awaiting_shipment"
//! awaiting_deliver = "awaiting_shipment"
//! delivering = "in_delivery"
//! delivered = "delivered"
//! cancelled = "cancelled"
//!
//! [stock]
//! poll_interval_secs = 1800
//! inter_account_delay_secs = 5
//! dry_run = false
//! ignore_articles = ["SAMPLE-0"]
//!
//! [[stock.warehouses]]
//! local_id = "wh-main"
//! remote_target = "221550"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//!
//! [report]
//! error_csv = "sync-errors.csv"
//! plan_csv = "push-plan.csv"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use stockbridge_core::{Article, OrgRefs, StatusMap};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Backend Settings
// =============================================================================

/// Inventory/accounting backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the backend API.
    pub base_url: String,

    /// API token. Consumed by the thin HTTP wrapper, never logged.
    #[serde(default)]
    pub token: String,

    /// Rows requested per stock-report page. Pagination terminates when a
    /// page comes back shorter than this.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    1000
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            base_url: String::new(),
            token: String::new(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Organizational References
// =============================================================================

/// Backend entity references stamped onto every created order.
/// All three are required; see [`SyncConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgSettings {
    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub counterparty: String,

    #[serde(default)]
    pub warehouse: String,
}

impl OrgSettings {
    /// Converts into the domain refs struct used in order payloads.
    pub fn to_refs(&self) -> OrgRefs {
        OrgRefs {
            organization: self.organization.clone(),
            counterparty: self.counterparty.clone(),
            warehouse: self.warehouse.clone(),
        }
    }
}

// =============================================================================
// Marketplace Accounts
// =============================================================================

/// One marketplace seller account. The engine treats accounts as an
/// ordered list: stock pushes walk it in this order, sequentially.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Short label used in logs, alerts and reports.
    pub name: String,

    /// Vendor API base URL for this account.
    pub api_url: String,

    /// Vendor client id. Consumed by the thin HTTP wrapper.
    #[serde(default)]
    pub client_id: String,

    /// Vendor API key. Consumed by the thin HTTP wrapper, never logged.
    #[serde(default)]
    pub api_key: String,
}

// =============================================================================
// Order Cadence Settings
// =============================================================================

/// Order synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Interval between order cycles (seconds). The short cadence.
    #[serde(default = "default_order_interval")]
    pub poll_interval_secs: u64,

    /// Fetch window: postings changed within the last N hours. Trims the
    /// moving window so reprocessing stays bounded.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,

    /// Hard cutoff: postings created before this date are always skipped.
    #[serde(default = "default_cutoff_date")]
    pub cutoff_date: NaiveDate,

    /// Vendor status filters passed to the posting list call.
    #[serde(default)]
    pub status_filters: Vec<String>,

    /// Prefix for deterministic local order names (prefix + posting number).
    #[serde(default = "default_order_name_prefix")]
    pub order_name_prefix: String,

    /// Vendor status string → local status name. Parsed into a typed
    /// [`StatusMap`] at startup; typos are startup-fatal.
    #[serde(default)]
    pub status_map: HashMap<String, String>,
}

fn default_order_interval() -> u64 {
    120
}

fn default_lookback_hours() -> u64 {
    24
}

fn default_cutoff_date() -> NaiveDate {
    // Postings older than the integration itself are never our business.
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn default_order_name_prefix() -> String {
    "MP-".to_string()
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            poll_interval_secs: default_order_interval(),
            lookback_hours: default_lookback_hours(),
            cutoff_date: default_cutoff_date(),
            status_filters: Vec::new(),
            order_name_prefix: default_order_name_prefix(),
            status_map: HashMap::new(),
        }
    }
}

// =============================================================================
// Stock Cadence Settings
// =============================================================================

/// A route from a backend warehouse to the marketplace's stock location id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRoute {
    /// Backend warehouse id the stock report is pulled for.
    pub local_id: String,

    /// Marketplace identifier stock is published under.
    pub remote_target: String,
}

/// Stock synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSettings {
    /// Interval between stock cycles (seconds). The long cadence.
    #[serde(default = "default_stock_interval")]
    pub poll_interval_secs: u64,

    /// Pause between per-account pushes (seconds). Sequential pushes plus
    /// this delay spread load across accounts.
    #[serde(default = "default_inter_account_delay")]
    pub inter_account_delay_secs: u64,

    /// When true, the cycle computes and reports everything but pushes
    /// nothing. Report generation is never skipped.
    #[serde(default)]
    pub dry_run: bool,

    /// Articles excluded from stock sync (normalized before comparison).
    #[serde(default)]
    pub ignore_articles: Vec<String>,

    /// Ordered warehouse routes. Arbitrary count.
    #[serde(default)]
    pub warehouses: Vec<WarehouseRoute>,
}

fn default_stock_interval() -> u64 {
    1800
}

fn default_inter_account_delay() -> u64 {
    5
}

impl Default for StockSettings {
    fn default() -> Self {
        StockSettings {
            poll_interval_secs: default_stock_interval(),
            inter_account_delay_secs: default_inter_account_delay(),
            dry_run: false,
            ignore_articles: Vec::new(),
            warehouses: Vec::new(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Retry budget for throttled remote calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per logical call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay; attempt N waits N * base before the next try.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Backoff before the next attempt, growing linearly with the attempt
    /// number that just failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }
}

// =============================================================================
// Report Settings
// =============================================================================

/// Paths for the append-only CSV outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_error_csv")]
    pub error_csv: PathBuf,

    #[serde(default = "default_plan_csv")]
    pub plan_csv: PathBuf,
}

fn default_error_csv() -> PathBuf {
    PathBuf::from("sync-errors.csv")
}

fn default_plan_csv() -> PathBuf {
    PathBuf::from("push-plan.csv")
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            error_csv: default_error_csv(),
            plan_csv: default_plan_csv(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete engine configuration. Loaded once at startup, immutable after.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Inventory backend connection.
    #[serde(default)]
    pub backend: BackendSettings,

    /// Organizational references for created orders.
    #[serde(default)]
    pub org: OrgSettings,

    /// Marketplace seller accounts, in push order.
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,

    /// Order cadence.
    #[serde(default)]
    pub orders: OrderSettings,

    /// Stock cadence.
    #[serde(default)]
    pub stock: StockSettings,

    /// Retry budget for throttled calls.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Report output paths.
    #[serde(default)]
    pub report: ReportSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (TOML)
    /// 3. Environment variables (`BRIDGE_*`)
    pub fn load(config_path: Option<&Path>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            info!(?path, "loading sync config from file");
            let contents = std::fs::read_to_string(path)?;
            config = toml::from_str(&contents)?;
        } else {
            debug!("no config file given, starting from defaults");
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses configuration from a TOML string (env overrides not applied).
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        let config: SyncConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration. Missing organizational references are
    /// fatal: no partial operation is permitted without them.
    pub fn validate(&self) -> SyncResult<()> {
        if self.backend.base_url.is_empty() {
            return Err(SyncError::InvalidConfig(
                "backend.base_url is required".into(),
            ));
        }
        // Must be an absolute http(s) URL; catches "localhost:8080"-style
        // values that would silently break every request path join.
        let parsed = Url::parse(&self.backend.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::InvalidConfig(format!(
                "backend.base_url must be http(s), got: {}",
                self.backend.base_url
            )));
        }

        if self.org.organization.is_empty() {
            return Err(SyncError::MissingReference("organization"));
        }
        if self.org.counterparty.is_empty() {
            return Err(SyncError::MissingReference("counterparty"));
        }
        if self.org.warehouse.is_empty() {
            return Err(SyncError::MissingReference("warehouse"));
        }

        if self.accounts.is_empty() {
            return Err(SyncError::InvalidConfig(
                "at least one [[accounts]] entry is required".into(),
            ));
        }
        let mut names = HashSet::new();
        for account in &self.accounts {
            if account.name.is_empty() {
                return Err(SyncError::InvalidConfig(
                    "account name must not be empty".into(),
                ));
            }
            if !names.insert(account.name.as_str()) {
                return Err(SyncError::InvalidConfig(format!(
                    "duplicate account name: {}",
                    account.name
                )));
            }
            let account_url = Url::parse(&account.api_url)?;
            if !matches!(account_url.scheme(), "http" | "https") {
                return Err(SyncError::InvalidConfig(format!(
                    "account '{}' api_url must be http(s), got: {}",
                    account.name, account.api_url
                )));
            }
        }

        if self.backend.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "backend.page_size must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }

        // Status map typos are fatal here, not at the first matching order.
        self.status_map()?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BRIDGE_BACKEND_URL") {
            debug!("overriding backend url from environment");
            self.backend.base_url = url;
        }
        if let Ok(token) = std::env::var("BRIDGE_BACKEND_TOKEN") {
            self.backend.token = token;
        }
        if let Ok(dry) = std::env::var("BRIDGE_DRY_RUN") {
            match dry.parse::<bool>() {
                Ok(v) => {
                    debug!(dry_run = v, "overriding dry_run from environment");
                    self.stock.dry_run = v;
                }
                Err(_) => warn!(value = %dry, "unparseable BRIDGE_DRY_RUN ignored"),
            }
        }
        if let Ok(prefix) = std::env::var("BRIDGE_ORDER_PREFIX") {
            self.orders.order_name_prefix = prefix;
        }
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The typed vendor-status → local-status table.
    pub fn status_map(&self) -> SyncResult<StatusMap> {
        Ok(StatusMap::from_raw(&self.orders.status_map)?)
    }

    /// Ignore-set with the same normalization as every other article.
    pub fn ignore_set(&self) -> HashSet<Article> {
        self.stock
            .ignore_articles
            .iter()
            .map(|raw| Article::new(raw))
            .collect()
    }

    /// Organizational refs for order payloads.
    pub fn org_refs(&self) -> OrgRefs {
        self.org.to_refs()
    }

    /// Fetch window for the order cadence.
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.orders.lookback_hours as i64)
    }

    /// Cutoff as a UTC instant (midnight of the configured date).
    pub fn cutoff(&self) -> chrono::DateTime<chrono::Utc> {
        self.orders
            .cutoff_date
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }

    /// Pause between per-account stock pushes.
    pub fn inter_account_delay(&self) -> Duration {
        Duration::from_secs(self.stock.inter_account_delay_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
