//! # Sync Orchestrator
//!
//! Composes the engine components into the two independent cadences.
//!
//! ## Cadence Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Orchestrator                                │
//! │                                                                         │
//! │  ORDER CADENCE (short interval)                                        │
//! │  ──────────────────────────────                                        │
//! │  per account: fetch postings ──► cutoff filter ──► dedupe              │
//! │       ──► reconcile each in fetch order                                │
//! │  one posting's failure → error records, batch continues                │
//! │  one account's fetch failure → other accounts continue                 │
//! │                                                                         │
//! │  STOCK CADENCE (long interval)                                         │
//! │  ─────────────────────────────                                         │
//! │  aggregate ──► per-account presence (tri-state) ──► eligibility        │
//! │       ──► PLAN REPORT (always, even dry-run) ──► push per account,     │
//! │           sequential, fixed delay between accounts                     │
//! │                                                                         │
//! │  The two cadences share nothing mutable: each cycle rebuilds its       │
//! │  working set from scratch.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use stockbridge_core::{
    compute_eligibility, AccountView, Article, EligibilityDecision, StockFact,
    SyncErrorRecord,
};

use crate::aggregator::StockAggregator;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::marketplace::Marketplace;
use crate::reconciler::{dedupe_postings, OrderReconciler, ReconcileAction};
use crate::remote::InventoryBackend;
use crate::report::{AlertSink, PushPlan, PushPlanEntry, ReportSink};

// =============================================================================
// Cycle Summaries
// =============================================================================

/// Outcome counts for one order cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderCycleSummary {
    /// Postings processed after cutoff filtering and dedup.
    pub processed: usize,

    /// Postings skipped for predating the hard cutoff.
    pub skipped_cutoff: usize,

    pub created: usize,
    pub status_applied: usize,
    pub unchanged: usize,
    pub rejected: usize,

    /// Postings whose reconciliation raised an error.
    pub failures: usize,

    /// Accounts whose posting fetch failed outright.
    pub fetch_failures: usize,
}

/// Outcome counts for one stock cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockCycleSummary {
    /// Stock facts collected from the backend.
    pub facts: usize,

    /// Distinct articles with a Publish decision.
    pub eligible: usize,

    /// Distinct articles denied because they are archived wherever listed.
    pub denied_archived: usize,

    /// Distinct articles denied because no account lists them.
    pub denied_unlisted: usize,

    /// Accounts that accepted the push.
    pub pushed_accounts: usize,

    /// True when pushes were suppressed.
    pub dry_run: bool,
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

/// Drives the order and stock cadences against the configured backend and
/// marketplace accounts. Holds no state across cycles.
pub struct SyncOrchestrator<B: InventoryBackend> {
    config: Arc<SyncConfig>,
    backend: Arc<B>,
    accounts: Vec<Arc<dyn Marketplace>>,
    reconciler: OrderReconciler<B>,
    alerts: Arc<dyn AlertSink>,
    reports: Arc<dyn ReportSink>,
    ignore: HashSet<Article>,
}

impl<B: InventoryBackend> SyncOrchestrator<B> {
    /// Wires up the orchestrator. Fails on configuration problems (bad
    /// status map) so a broken deployment never half-runs.
    pub fn new(
        config: Arc<SyncConfig>,
        backend: Arc<B>,
        accounts: Vec<Arc<dyn Marketplace>>,
        alerts: Arc<dyn AlertSink>,
        reports: Arc<dyn ReportSink>,
    ) -> SyncResult<Self> {
        let reconciler = OrderReconciler::new(
            backend.clone(),
            reports.clone(),
            config.status_map()?,
            config.org_refs(),
            config.orders.order_name_prefix.clone(),
        );
        let ignore = config.ignore_set();

        Ok(SyncOrchestrator {
            config,
            backend,
            accounts,
            reconciler,
            alerts,
            reports,
            ignore,
        })
    }

    // =========================================================================
    // Order Cadence
    // =========================================================================

    /// Runs one order cycle. Never fails as a whole: every failure is
    /// contained at account or posting granularity.
    pub async fn run_order_cycle(&self) -> OrderCycleSummary {
        let since = Utc::now() - self.config.lookback();
        let cutoff = self.config.cutoff();
        let filters = &self.config.orders.status_filters;
        let mut summary = OrderCycleSummary::default();

        for account in &self.accounts {
            let postings = match account.list_postings_since(since, filters).await {
                Ok(postings) => postings,
                Err(err) => {
                    warn!(
                        account = account.account(),
                        error = %err,
                        "posting fetch failed; skipping account this cycle"
                    );
                    summary.fetch_failures += 1;
                    continue;
                }
            };

            // Hard cutoff first: these postings predate the integration
            // and must not even reach dedup or error reporting.
            let fetched = postings.len();
            let postings: Vec<_> = postings
                .into_iter()
                .filter(|p| p.created_at >= cutoff)
                .collect();
            summary.skipped_cutoff += fetched - postings.len();

            let postings = dedupe_postings(postings);
            summary.processed += postings.len();

            // Fetch order is processing order; no reordering.
            for posting in &postings {
                match self.reconciler.reconcile(posting).await {
                    Ok(outcome) => match outcome.action {
                        ReconcileAction::Created => summary.created += 1,
                        ReconcileAction::StatusApplied => summary.status_applied += 1,
                        ReconcileAction::Unchanged => summary.unchanged += 1,
                        ReconcileAction::Rejected => summary.rejected += 1,
                    },
                    Err(err) => {
                        warn!(
                            account = account.account(),
                            posting = %posting.number,
                            error = %err,
                            "posting reconciliation failed"
                        );
                        self.reports
                            .append_errors(&[SyncErrorRecord::new(
                                Utc::now(),
                                &posting.number,
                                "",
                                "",
                                format!("reconciliation failed: {err}"),
                            )])
                            .await;
                        summary.failures += 1;
                    }
                }
            }
        }

        info!(
            processed = summary.processed,
            created = summary.created,
            status_applied = summary.status_applied,
            rejected = summary.rejected,
            failures = summary.failures,
            skipped_cutoff = summary.skipped_cutoff,
            "order cycle finished"
        );

        if summary.rejected + summary.failures + summary.fetch_failures > 0 {
            self.alerts
                .notify(&format!(
                    "order cycle: {} rejected, {} failed, {} accounts unreachable (see error report)",
                    summary.rejected, summary.failures, summary.fetch_failures
                ))
                .await;
        }

        summary
    }

    // =========================================================================
    // Stock Cadence
    // =========================================================================

    /// Runs one stock cycle.
    ///
    /// Fails only when the backend aggregation itself fails - pushing half
    /// a snapshot would publish phantom zeroes. Everything after the
    /// snapshot is contained per account.
    pub async fn run_stock_cycle(&self) -> SyncResult<StockCycleSummary> {
        let aggregator = StockAggregator::new(
            self.backend.as_ref(),
            &self.config.stock.warehouses,
            self.config.backend.page_size,
            &self.ignore,
        );
        let snapshot = aggregator.collect().await?;
        let articles = snapshot.articles();

        // Presence per account, explicitly tri-state: a dead account is
        // Unavailable, which is not the same thing as an empty catalog.
        let mut views = Vec::with_capacity(self.accounts.len());
        for account in &self.accounts {
            match account.product_states(&articles).await {
                Ok(states) => views.push(AccountView::Available(states)),
                Err(err) => {
                    warn!(
                        account = account.account(),
                        error = %err,
                        "state lookup failed; account treated as unavailable this cycle"
                    );
                    views.push(AccountView::Unavailable);
                }
            }
        }

        let decisions = compute_eligibility(articles.iter(), &views);

        let mut summary = StockCycleSummary {
            facts: snapshot.len(),
            dry_run: self.config.stock.dry_run,
            ..Default::default()
        };
        for decision in decisions.values() {
            match decision {
                EligibilityDecision::Publish => summary.eligible += 1,
                EligibilityDecision::DeniedArchived => summary.denied_archived += 1,
                EligibilityDecision::DeniedUnlisted => summary.denied_unlisted += 1,
            }
        }

        let eligible_facts: Vec<StockFact> = snapshot
            .facts
            .iter()
            .filter(|fact| {
                decisions
                    .get(&fact.article)
                    .is_some_and(EligibilityDecision::is_allowed)
            })
            .cloned()
            .collect();

        // The plan goes out BEFORE any push so the record exists even when
        // a push fails halfway or the cycle is a dry run.
        let plan = PushPlan {
            generated_at: Utc::now(),
            dry_run: self.config.stock.dry_run,
            accounts: self.accounts.iter().map(|a| a.account().to_string()).collect(),
            entries: eligible_facts
                .iter()
                .map(|fact| PushPlanEntry {
                    article: fact.article.as_str().to_string(),
                    name: snapshot
                        .name_of(&fact.article)
                        .unwrap_or_default()
                        .to_string(),
                    warehouse_target: fact.warehouse_target.clone(),
                    quantity: fact.quantity,
                })
                .collect(),
        };
        self.reports.emit_push_plan(&plan).await;

        if self.config.stock.dry_run {
            info!(
                eligible = summary.eligible,
                "dry run: push plan recorded, nothing pushed"
            );
        } else {
            // Sequential, configured order, spaced out: the delay between
            // accounts is the load-spreading mechanism, so pushes must
            // never run in parallel.
            for (index, account) in self.accounts.iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(self.config.inter_account_delay()).await;
                }
                match account.push_stock(&eligible_facts).await {
                    Ok(()) => {
                        info!(
                            account = account.account(),
                            facts = eligible_facts.len(),
                            "stock pushed"
                        );
                        summary.pushed_accounts += 1;
                    }
                    Err(err) => {
                        warn!(
                            account = account.account(),
                            error = %err,
                            "stock push failed"
                        );
                        self.alerts
                            .notify(&format!(
                                "stock push failed for account '{}': {}",
                                account.account(),
                                err
                            ))
                            .await;
                    }
                }
            }
        }

        // Cycle totals are operator-facing.
        self.alerts
            .notify(&format!(
                "stock cycle: {} facts, {} eligible, {} archived, {} unlisted, pushed to {}/{} accounts{}",
                summary.facts,
                summary.eligible,
                summary.denied_archived,
                summary.denied_unlisted,
                summary.pushed_accounts,
                self.accounts.len(),
                if summary.dry_run { " (dry run)" } else { "" }
            ))
            .await;

        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
