//! # Report & Alert Sinks
//!
//! Fire-and-forget output channels: an append-only CSV report for specific
//! unresolved items, and a text alert channel for anything the operator is
//! expected to act on.
//!
//! ## Output Channels
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Output Channels                                  │
//! │                                                                         │
//! │  ReportSink (rows, append-only)      AlertSink (text, operator-facing) │
//! │  ──────────────────────────────      ───────────────────────────────── │
//! │  • per-line sync error records       • rate-limit exhaustion           │
//! │  • stock push plan (every cycle,     • per-account push failures       │
//! │    INCLUDING dry runs)               • cycle totals                    │
//! │                                                                         │
//! │  Sink failures are logged and swallowed: reporting must never take     │
//! │  the pipeline down with it.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use stockbridge_core::SyncErrorRecord;

// =============================================================================
// Push Plan
// =============================================================================

/// One article's worth of the stock push plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PushPlanEntry {
    /// Canonical article key.
    pub article: String,

    /// Display name (first seen in the stock report), may be empty.
    pub name: String,

    /// Remote stock location.
    pub warehouse_target: String,

    /// Units to publish.
    pub quantity: u64,
}

/// What one stock cycle intends to push, captured BEFORE any push executes
/// so the record survives push failures and dry runs alike.
#[derive(Debug, Clone)]
pub struct PushPlan {
    pub generated_at: DateTime<Utc>,

    /// True when the cycle will suppress the actual push.
    pub dry_run: bool,

    /// Accounts the plan targets, in push order.
    pub accounts: Vec<String>,

    pub entries: Vec<PushPlanEntry>,
}

// =============================================================================
// Sink Traits
// =============================================================================

/// Operator alert channel. Fire-and-forget: implementations log delivery
/// failures and never propagate them.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Append-only row report. Fire-and-forget, same policy as [`AlertSink`].
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Appends sync error rows.
    async fn append_errors(&self, rows: &[SyncErrorRecord]);

    /// Records the stock push plan for one cycle.
    async fn emit_push_plan(&self, plan: &PushPlan);
}

// =============================================================================
// Log Alert Sink
// =============================================================================

/// Alert sink backed by the tracing pipeline. The default when no external
/// messenger is wired in.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, text: &str) {
        warn!(alert = text, "operator alert");
    }
}

// =============================================================================
// CSV Report Sink
// =============================================================================

const ERROR_HEADER: &str = "timestamp,order_number,article,product_name,reason";
const PLAN_HEADER: &str = "generated_at,dry_run,accounts,article,name,warehouse_target,quantity";

/// Escapes one CSV field: quote when it contains a delimiter, quote or
/// newline; double inner quotes.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Append-only CSV files: one for error records, one for push plans.
/// Headers are written when a file is first created, never again.
pub struct CsvReportSink {
    error_path: PathBuf,
    plan_path: PathBuf,
}

impl CsvReportSink {
    pub fn new(error_path: impl Into<PathBuf>, plan_path: impl Into<PathBuf>) -> Self {
        CsvReportSink {
            error_path: error_path.into(),
            plan_path: plan_path.into(),
        }
    }

    /// Appends lines to `path`, prepending `header` when the file does not
    /// exist yet. Returns io errors to the caller for logging.
    fn append(path: &Path, header: &str, lines: &[String]) -> std::io::Result<()> {
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if fresh {
            writeln!(file, "{header}")?;
        }
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn append_errors(&self, rows: &[SyncErrorRecord]) {
        if rows.is_empty() {
            return;
        }
        let lines: Vec<String> = rows
            .iter()
            .map(|r| {
                format!(
                    "{},{},{},{},{}",
                    r.timestamp.to_rfc3339(),
                    csv_field(&r.order_number),
                    csv_field(&r.article),
                    csv_field(&r.product_name),
                    csv_field(&r.reason),
                )
            })
            .collect();

        if let Err(e) = Self::append(&self.error_path, ERROR_HEADER, &lines) {
            error!(?e, path = ?self.error_path, "failed to append error report");
        } else {
            info!(rows = rows.len(), path = ?self.error_path, "error report appended");
        }
    }

    async fn emit_push_plan(&self, plan: &PushPlan) {
        let stamp = plan.generated_at.to_rfc3339();
        let accounts = plan.accounts.join("|");
        let lines: Vec<String> = plan
            .entries
            .iter()
            .map(|e| {
                format!(
                    "{},{},{},{},{},{},{}",
                    stamp,
                    plan.dry_run,
                    csv_field(&accounts),
                    csv_field(&e.article),
                    csv_field(&e.name),
                    csv_field(&e.warehouse_target),
                    e.quantity,
                )
            })
            .collect();

        if let Err(e) = Self::append(&self.plan_path, PLAN_HEADER, &lines) {
            error!(?e, path = ?self.plan_path, "failed to write push plan");
        } else {
            info!(
                rows = plan.entries.len(),
                dry_run = plan.dry_run,
                path = ?self.plan_path,
                "push plan recorded"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stockbridge-{tag}-{}.csv", uuid::Uuid::new_v4()))
    }

    fn record(order: &str, article: &str, reason: &str) -> SyncErrorRecord {
        SyncErrorRecord::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            order,
            article,
            "Blue Mug",
            reason,
        )
    }

    #[test]
    fn csv_fields_with_delimiters_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[tokio::test]
    async fn error_rows_append_with_single_header() {
        let path = temp_path("errors");
        let sink = CsvReportSink::new(&path, temp_path("plan"));

        sink.append_errors(&[record("ORD-1", "A-01", "no catalog product")])
            .await;
        sink.append_errors(&[record("ORD-2", "B-02", "reason, with comma")])
            .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ERROR_HEADER);
        assert!(lines[1].contains("ORD-1"));
        assert!(lines[2].contains("\"reason, with comma\""));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn push_plan_rows_carry_dry_run_flag() {
        let path = temp_path("plan");
        let sink = CsvReportSink::new(temp_path("errors"), &path);

        let plan = PushPlan {
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            dry_run: true,
            accounts: vec!["main".into(), "second".into()],
            entries: vec![PushPlanEntry {
                article: "A-01".into(),
                name: "Blue Mug".into(),
                warehouse_target: "221550".into(),
                quantity: 5,
            }],
        };
        sink.emit_push_plan(&plan).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], PLAN_HEADER);
        assert!(lines[1].contains("true"));
        assert!(lines[1].contains("main|second"));
        assert!(lines[1].contains("A-01"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn empty_error_batch_touches_nothing() {
        let path = temp_path("errors");
        let sink = CsvReportSink::new(&path, temp_path("plan"));
        sink.append_errors(&[]).await;
        assert!(!path.exists());
    }
}
