//! # Order Status Vocabulary & Mapping
//!
//! Local order lifecycle states and the configuration-supplied table that
//! maps a vendor's posting status strings onto them.
//!
//! ## Status Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Status Mapping Pipeline                            │
//! │                                                                         │
//! │  Vendor posting status        StatusMap           Local order status   │
//! │  (finite, vendor-specific)    (from config)       (LocalStatus enum)   │
//! │                                                                         │
//! │  "awaiting_packaging"   ──►   lookup   ──►   AwaitingShipment          │
//! │  "delivering"           ──►   lookup   ──►   InDelivery                │
//! │  "arbitration"          ──►   miss     ──►   (no-op, local untouched)  │
//! │                                                                         │
//! │  An unmapped vendor status is an explicit NO-OP, never a silent        │
//! │  default: the local order keeps whatever status it already has.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Local Status
// =============================================================================

/// Lifecycle status of a local order in the inventory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalStatus {
    /// Freshly registered, not yet picked.
    New,

    /// Accepted and waiting to be handed to the carrier.
    AwaitingShipment,

    /// Handed over, on its way to the customer.
    InDelivery,

    /// Received by the customer.
    Delivered,

    /// Cancelled on the remote side.
    Cancelled,

    /// Came back after delivery or a refused handover.
    Returned,
}

impl LocalStatus {
    /// True for statuses that mean the goods have physically left the
    /// warehouse, which is when a shipment/demand document must exist
    /// against the local order.
    pub fn triggers_shipment(&self) -> bool {
        matches!(self, LocalStatus::InDelivery | LocalStatus::Delivered)
    }
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocalStatus::New => "new",
            LocalStatus::AwaitingShipment => "awaiting_shipment",
            LocalStatus::InDelivery => "in_delivery",
            LocalStatus::Delivered => "delivered",
            LocalStatus::Cancelled => "cancelled",
            LocalStatus::Returned => "returned",
        };
        f.write_str(s)
    }
}

/// Error for status strings that are not part of the local vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "unknown local status: '{0}'. Valid options: new, awaiting_shipment, \
     in_delivery, delivered, cancelled, returned"
)]
pub struct ParseStatusError(pub String);

impl FromStr for LocalStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LocalStatus::New),
            "awaiting_shipment" => Ok(LocalStatus::AwaitingShipment),
            "in_delivery" => Ok(LocalStatus::InDelivery),
            "delivered" => Ok(LocalStatus::Delivered),
            "cancelled" => Ok(LocalStatus::Cancelled),
            "returned" => Ok(LocalStatus::Returned),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// =============================================================================
// Status Map
// =============================================================================

/// The vendor-status → local-status table, supplied by configuration and
/// fixed for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct StatusMap {
    entries: HashMap<String, LocalStatus>,
}

impl StatusMap {
    /// Builds the table from already-typed pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, LocalStatus)>,
    {
        StatusMap {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Builds the table from raw config strings, rejecting any value that
    /// is not a known local status. Config typos fail startup rather than
    /// silently dropping transitions.
    pub fn from_raw(raw: &HashMap<String, String>) -> Result<Self, ParseStatusError> {
        let mut entries = HashMap::with_capacity(raw.len());
        for (vendor, local) in raw {
            entries.insert(vendor.clone(), local.parse()?);
        }
        Ok(StatusMap { entries })
    }

    /// Maps a vendor status string to its local status, if the table knows
    /// it. `None` means "leave the local order alone".
    pub fn map_vendor(&self, vendor_status: &str) -> Option<LocalStatus> {
        self.entries.get(vendor_status).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_status_round_trips_through_strings() {
        for status in [
            LocalStatus::New,
            LocalStatus::AwaitingShipment,
            LocalStatus::InDelivery,
            LocalStatus::Delivered,
            LocalStatus::Cancelled,
            LocalStatus::Returned,
        ] {
            assert_eq!(status.to_string().parse::<LocalStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<LocalStatus>().is_err());
    }

    #[test]
    fn shipment_trigger_covers_delivery_states_only() {
        assert!(LocalStatus::InDelivery.triggers_shipment());
        assert!(LocalStatus::Delivered.triggers_shipment());
        assert!(!LocalStatus::New.triggers_shipment());
        assert!(!LocalStatus::AwaitingShipment.triggers_shipment());
        assert!(!LocalStatus::Cancelled.triggers_shipment());
    }

    #[test]
    fn unmapped_vendor_status_is_a_miss() {
        let map = StatusMap::from_pairs([
            ("awaiting_packaging".to_string(), LocalStatus::AwaitingShipment),
            ("delivering".to_string(), LocalStatus::InDelivery),
        ]);
        assert_eq!(
            map.map_vendor("awaiting_packaging"),
            Some(LocalStatus::AwaitingShipment)
        );
        assert_eq!(map.map_vendor("arbitration"), None);
    }

    #[test]
    fn raw_table_with_typo_is_rejected() {
        let mut raw = HashMap::new();
        raw.insert("delivering".to_string(), "in_delivry".to_string());
        let err = StatusMap::from_raw(&raw).unwrap_err();
        assert_eq!(err.0, "in_delivry");
    }

    #[test]
    fn raw_table_parses_known_statuses() {
        let mut raw = HashMap::new();
        raw.insert("delivered".to_string(), "delivered".to_string());
        raw.insert("cancelled".to_string(), "cancelled".to_string());
        let map = StatusMap::from_raw(&raw).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.map_vendor("delivered"), Some(LocalStatus::Delivered));
    }
}
