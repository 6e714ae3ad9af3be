//! # Sync Error Types
//!
//! Error types for the reconciliation engine.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌───────────────────────┐  │
//! │  │  Configuration  │  │   Remote Call    │  │       Data            │  │
//! │  │                 │  │                  │  │                       │  │
//! │  │  InvalidConfig  │  │  RateLimited     │  │  Decode               │  │
//! │  │  MissingRef     │  │  RateLimit-      │  │  UnexpectedPayload    │  │
//! │  │  ConfigLoad-    │  │    Exhausted     │  │                       │  │
//! │  │    Failed       │  │  Api / Network   │  │                       │  │
//! │  └─────────────────┘  └──────────────────┘  └───────────────────────┘  │
//! │                                                                         │
//! │  Handling policy (smallest unit that allows forward progress):         │
//! │  • RateLimited        → retried by the client, then escalated          │
//! │  • Api (validation)   → never retried, becomes a SyncErrorRecord       │
//! │  • Config             → aborts startup, no partial operation           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all engine failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required organizational reference is missing. Startup must abort:
    /// orders created without these are invalid backend documents.
    #[error("missing required reference: {0}. Check the [org] config section")]
    MissingReference(&'static str),

    /// Failed to read or parse the config file.
    #[error("failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Remote Call Errors
    // =========================================================================
    /// The remote throttled this call. Transient: the rate-limited client
    /// retries these with linear backoff.
    #[error("rate limited on '{operation}'")]
    RateLimited { operation: String },

    /// The retry budget for a throttled call ran out. Terminal for that
    /// call; the operator has already been alerted once.
    #[error("rate limit retries exhausted on '{operation}' after {attempts} attempts")]
    RateLimitExhausted { operation: String, attempts: u32 },

    /// The remote rejected the call with a non-throttle error. Surfaced
    /// verbatim and never retried: retrying cannot fix a malformed request.
    #[error("api error on '{operation}' (status {status}): {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// Transport-level failure (connect, DNS, timeout).
    #[error("network error on '{operation}': {message}")]
    Network { operation: String, message: String },

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// A response payload did not decode into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A response decoded but violated an expected invariant.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidConfig(format!("invalid url: {err}"))
    }
}

impl From<stockbridge_core::ParseStatusError> for SyncError {
    fn from(err: stockbridge_core::ParseStatusError) -> Self {
        SyncError::InvalidConfig(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// True for the throttle signal the rate-limited client retries on.
    /// Everything else is terminal for the call that produced it.
    pub fn is_throttle(&self) -> bool {
        matches!(self, SyncError::RateLimited { .. })
    }

    /// True if this error indicates a configuration problem (startup-fatal).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingReference(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }
}
