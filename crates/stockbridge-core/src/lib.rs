//! # stockbridge-core: Pure Business Logic for Stockbridge
//!
//! This crate is the **heart** of Stockbridge. It contains the decision
//! logic of the reconciliation engine as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stockbridge Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        apps/syncd                               │   │
//! │  │       config load ──► HTTP wrappers ──► cadence scheduler       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                     stockbridge-sync                            │   │
//! │  │   rate-limited client, aggregator, reconciler, orchestrator     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockbridge-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐  │   │
//! │  │   │  article  │  │ eligibility │  │  status  │  │   types   │  │   │
//! │  │   │ normalize │  │  decisions  │  │ mapping  │  │  Posting  │  │   │
//! │  │   │           │  │             │  │          │  │ StockFact │  │   │
//! │  │   └───────────┘  └─────────────┘  └──────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK READS • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`article`] - Confusable-character normalization into canonical keys
//! - [`eligibility`] - Cross-account publish/deny decisions
//! - [`status`] - Local status vocabulary and the vendor-status mapping table
//! - [`types`] - Domain types (StockFact, Posting, NewLocalOrder, etc.)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same inputs always produce the same decisions
//! 2. **No I/O**: network, file system and clock access are FORBIDDEN here;
//!    timestamps are passed in by callers
//! 3. **Normalized by Construction**: an [`article::Article`] cannot hold a
//!    raw, un-normalized key
//! 4. **Explicit Errors**: the only fallible operations are config-facing
//!    parses, and those return typed errors
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbridge_core::{compute_eligibility, AccountView, Article, Presence};
//! use std::collections::HashMap;
//!
//! // Cyrillic and Latin spellings collapse into one canonical key.
//! let key = Article::new("А-01");
//! assert_eq!(key, Article::new("A-01"));
//!
//! // One account still sells it, the other never listed it: publish.
//! let states: HashMap<_, _> = [(key.clone(), Presence::Active)].into();
//! let views = [AccountView::Available(states), AccountView::Unavailable];
//! let decisions = compute_eligibility([&key], &views);
//! assert!(decisions[&key].is_allowed());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod article;
pub mod eligibility;
pub mod status;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockbridge_core::Article` instead of
// `use stockbridge_core::article::Article`

pub use article::Article;
pub use eligibility::{
    compute_eligibility, AccountView, EligibilityDecision, Presence,
};
pub use status::{LocalStatus, ParseStatusError, StatusMap};
pub use types::*;
