//! # Domain Types
//!
//! Core domain types used throughout Stockbridge.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockFact     │   │    Posting      │   │  NewLocalOrder  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  article        │   │  number         │   │  name           │       │
//! │  │  warehouse      │   │  status (vendor)│   │  status         │       │
//! │  │  quantity       │   │  created_at     │   │  lines          │       │
//! │  └─────────────────┘   │  lines          │   │  refs (org)     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ StockSnapshot   │   │ SyncErrorRecord │   │ ProductRef /    │       │
//! │  │  facts + names  │   │  append-only    │   │ OrderRef /      │       │
//! │  │  (one cycle)    │   │  report row     │   │ ShipmentRef     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Model
//! Everything here is a transient view/request object reconstructed every
//! cycle from the authoritative external systems. The engine owns no durable
//! state beyond the append-only error report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::article::Article;
use crate::status::LocalStatus;

// =============================================================================
// Organizational References
// =============================================================================

/// Backend entity references every created order must carry.
///
/// These come from configuration and are required at startup: an order
/// without an organization, counterparty or warehouse reference is not a
/// valid document in the inventory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRefs {
    /// Owning organization entity id.
    pub organization: String,

    /// Counterparty (the marketplace as a buyer) entity id.
    pub counterparty: String,

    /// Warehouse the order ships from.
    pub warehouse: String,
}

// =============================================================================
// Stock
// =============================================================================

/// One raw row of the backend's per-warehouse stock report, before
/// normalization. Articles here are whatever the backend stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    /// Raw article code. May be empty, padded, or homoglyph-confused.
    pub article: String,

    /// Human-readable product name, kept for reporting only.
    pub name: String,

    /// Reported quantity. The backend reports reserves as negatives, so
    /// this is signed; the aggregator clamps it.
    pub quantity: i64,
}

/// A single normalized stock observation: this many units of this product
/// at this remote stock location. Ephemeral - rebuilt every stock cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFact {
    /// Canonical product key.
    pub article: Article,

    /// The remote marketplace's identifier for the stock location.
    pub warehouse_target: String,

    /// Units available. Never negative: reported negatives clamp to zero.
    pub quantity: u64,
}

/// Everything one stock cycle learned from the backend: the facts plus the
/// first-seen display name per article (only the key participates in
/// matching; the name exists for humans reading reports).
#[derive(Debug, Clone, Default)]
pub struct StockSnapshot {
    pub facts: Vec<StockFact>,
    names: HashMap<Article, String>,
}

impl StockSnapshot {
    /// Records a fact, remembering the first-seen name for its article.
    pub fn record(&mut self, fact: StockFact, name: &str) {
        self.names
            .entry(fact.article.clone())
            .or_insert_with(|| name.to_string());
        self.facts.push(fact);
    }

    /// Unique articles in first-seen order.
    pub fn articles(&self) -> Vec<Article> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for fact in &self.facts {
            if seen.insert(&fact.article) {
                out.push(fact.article.clone());
            }
        }
        out
    }

    /// Display name recorded for an article, if any row carried one.
    pub fn name_of(&self, article: &Article) -> Option<&str> {
        self.names.get(article).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

// =============================================================================
// Remote Orders (Postings)
// =============================================================================

/// One line of a remote posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingLine {
    /// The seller's offer/article code as the marketplace reports it (raw,
    /// not yet normalized).
    pub article: String,

    /// Product name as the marketplace displays it.
    pub name: String,

    /// Ordered quantity.
    pub quantity: u64,
}

/// A remote marketplace order (posting). Externally owned: read-only from
/// this system's perspective except for status transitions it requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// The vendor's posting/order number. Identity for dedup and for the
    /// deterministic local order name.
    pub number: String,

    /// Vendor status code, from the vendor's own finite vocabulary.
    pub status: String,

    /// When the posting was created on the remote side.
    pub created_at: DateTime<Utc>,

    /// Ordered items.
    pub lines: Vec<PostingLine>,
}

// =============================================================================
// Backend Entity References
// =============================================================================

/// A product entity in the inventory backend's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Backend entity id.
    pub id: String,

    /// Backend display name.
    pub name: String,
}

/// A customer order entity in the inventory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Backend entity id.
    pub id: String,

    /// Deterministic order name (prefix + posting number).
    pub name: String,
}

/// A shipment/demand document in the inventory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRef {
    /// Backend entity id.
    pub id: String,
}

// =============================================================================
// Local Order Creation
// =============================================================================

/// One resolved line of a local order: a catalog product plus a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOrderLine {
    pub product: ProductRef,
    pub quantity: u64,
}

/// Request payload for creating a local order. Built only after EVERY
/// posting line resolved; partial orders are never represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocalOrder {
    /// Deterministic name: configured prefix + posting number. At most one
    /// local order exists per posting number.
    pub name: String,

    /// Initial status mapped from the vendor status. `None` when the
    /// vendor status is unmapped: the backend applies its own default.
    pub status: Option<LocalStatus>,

    /// Resolved line items.
    pub lines: Vec<LocalOrderLine>,

    /// Organizational references from configuration.
    pub refs: OrgRefs,
}

// =============================================================================
// Sync Error Record
// =============================================================================

/// One append-only row of the error report. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncErrorRecord {
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,

    /// Posting/order number the failure belongs to, empty when the failure
    /// is not order-scoped.
    pub order_number: String,

    /// Article involved (raw or normalized, whichever was at hand), empty
    /// when the failure is not line-scoped.
    pub article: String,

    /// Human-readable product name when known.
    pub product_name: String,

    /// Human-readable failure reason.
    pub reason: String,
}

impl SyncErrorRecord {
    /// Builds a record stamped with the given time.
    pub fn new(
        timestamp: DateTime<Utc>,
        order_number: impl Into<String>,
        article: impl Into<String>,
        product_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SyncErrorRecord {
            timestamp,
            order_number: order_number.into(),
            article: article.into(),
            product_name: product_name.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
