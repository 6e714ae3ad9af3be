//! # Rate-Limited Request Client
//!
//! Wraps one account's [`Transport`] with bounded retry on throttling.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Rate-Limited Call Flow                               │
//! │                                                                         │
//! │   call(op, body)                                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   attempt = 1 ──► transport.call() ──► Ok ──────────► return response  │
//! │        ▲                │                                               │
//! │        │                ├─ RateLimited & attempt < max                  │
//! │        │                │      sleep(attempt * base_delay)              │
//! │        └────────────────┘                                               │
//! │                         │                                               │
//! │                         ├─ RateLimited & attempt == max                 │
//! │                         │      alert ONCE ──► Err(RateLimitExhausted)   │
//! │                         │                                               │
//! │                         └─ any other error ──► Err(verbatim, no retry)  │
//! │                                                                         │
//! │   Retries never overlap: the loop runs on the caller's task and each   │
//! │   attempt is awaited before the next one starts.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation-class errors are deliberately NOT retried: retrying cannot
//! fix a malformed request, and hammering a broken call only burns quota.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::{SyncError, SyncResult};
use crate::remote::{ApiResponse, Transport};
use crate::report::AlertSink;

// =============================================================================
// Rate-Limited Client
// =============================================================================

/// Retry-aware wrapper around one account's transport.
pub struct RateLimitedClient<T: Transport> {
    /// Account label, for logs and alerts.
    account: String,

    /// The thin per-vendor wrapper doing the actual I/O.
    transport: T,

    /// Retry budget.
    retry: RetrySettings,

    /// Where rate-limit exhaustion gets escalated (exactly once per call).
    alerts: Arc<dyn AlertSink>,
}

impl<T: Transport> RateLimitedClient<T> {
    pub fn new(
        account: impl Into<String>,
        transport: T,
        retry: RetrySettings,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        RateLimitedClient {
            account: account.into(),
            transport,
            retry,
            alerts,
        }
    }

    /// Account label this client belongs to.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Executes one logical call, retrying throttles with linear backoff.
    ///
    /// Blocks the invoking unit of work until success or terminal failure;
    /// the explicit bounded loop is the whole retry policy - there is no
    /// hidden retry anywhere else in the engine.
    pub async fn call(&self, operation: &str, body: &Value) -> SyncResult<ApiResponse> {
        let max = self.retry.max_attempts;

        for attempt in 1..=max {
            debug!(
                account = %self.account,
                operation,
                attempt,
                request = %body,
                "outbound call"
            );

            match self.transport.call(operation, body).await {
                Ok(response) => {
                    // Observational only: raw response logged for
                    // operability, never inspected here.
                    debug!(
                        account = %self.account,
                        operation,
                        status = response.status,
                        response = %response.body,
                        "call succeeded"
                    );
                    return Ok(response);
                }
                Err(err) if err.is_throttle() => {
                    warn!(
                        account = %self.account,
                        operation,
                        attempt,
                        max_attempts = max,
                        "throttled by remote"
                    );
                    if attempt == max {
                        break;
                    }
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                }
                Err(err) => {
                    debug!(
                        account = %self.account,
                        operation,
                        error = %err,
                        "terminal call failure"
                    );
                    return Err(err);
                }
            }
        }

        // One alert per exhausted call, not one per throttled attempt.
        self.alerts
            .notify(&format!(
                "rate limit exhausted: account '{}', operation '{}', {} attempts",
                self.account, operation, max
            ))
            .await;

        Err(SyncError::RateLimitExhausted {
            operation: operation.to_string(),
            attempts: max,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
