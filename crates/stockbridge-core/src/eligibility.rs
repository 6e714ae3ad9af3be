//! # Cross-Account Eligibility
//!
//! Decides, per product key, whether its stock may be published, based on
//! the product's presence state across all configured marketplace accounts.
//!
//! ## Decision Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Eligibility Decision Table                         │
//! │                                                                         │
//! │  ACTIVE in at least one account     →  Publish                         │
//! │  ARCHIVED somewhere, active nowhere →  DeniedArchived                  │
//! │  ABSENT in every account            →  DeniedUnlisted                  │
//! │                                                                         │
//! │  A product archived on one storefront but still live on another IS     │
//! │  published: stock goes to whichever catalog still allows it. A         │
//! │  product retired everywhere it was ever listed, or unknown             │
//! │  everywhere, gets no stock pushed at all.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The filter holds no memory between cycles: it is a pure function of the
//! presence snapshots taken this cycle, so external state changes flip the
//! decision on the very next cycle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::article::Article;

// =============================================================================
// Presence State
// =============================================================================

/// Presence of a product in one remote account's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Listed and sellable.
    Active,

    /// Listed but retired by the seller.
    Archived,

    /// No catalog entry. This is the default for missing lookups and for
    /// any state string the vendor invents that we do not recognize.
    #[default]
    #[serde(other)]
    Absent,
}

// =============================================================================
// Account View
// =============================================================================

/// One account's contribution to the eligibility computation.
///
/// A failed state lookup is an explicit `Unavailable`, never an empty map:
/// the two mean different things ("we could not ask" vs. "we asked and
/// nothing is listed") even though both degrade to `Absent` per key.
#[derive(Debug, Clone)]
pub enum AccountView {
    /// The account answered; missing keys are `Absent`.
    Available(HashMap<Article, Presence>),

    /// The state lookup failed entirely. Contributes `Absent` for every
    /// key, degrading eligibility conservatively without halting the
    /// pipeline.
    Unavailable,
}

impl AccountView {
    /// Presence of a product in this account's catalog.
    pub fn presence_of(&self, article: &Article) -> Presence {
        match self {
            AccountView::Available(states) => {
                states.get(article).copied().unwrap_or_default()
            }
            AccountView::Unavailable => Presence::Absent,
        }
    }

    /// True if the underlying lookup succeeded.
    pub fn is_available(&self) -> bool {
        matches!(self, AccountView::Available(_))
    }
}

// =============================================================================
// Eligibility Decision
// =============================================================================

/// Per-product publish decision, with the deny reason kept distinguishable
/// for reporting (delisted vs. never listed are different operator
/// conversations even though both deny the push).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityDecision {
    /// Stock may be published.
    Publish,

    /// Archived wherever it was listed; active nowhere.
    DeniedArchived,

    /// Absent from every account.
    DeniedUnlisted,
}

impl EligibilityDecision {
    /// Collapses the decision into the publish/deny boolean.
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, EligibilityDecision::Publish)
    }
}

// =============================================================================
// Eligibility Computation
// =============================================================================

/// Computes the publish decision for every key against the given account
/// views.
///
/// Pure function of its inputs: no clock, no caches, no memory between
/// cycles. With an empty `views` slice every key is `DeniedUnlisted`.
pub fn compute_eligibility<'a, I>(
    keys: I,
    views: &[AccountView],
) -> HashMap<Article, EligibilityDecision>
where
    I: IntoIterator<Item = &'a Article>,
{
    let mut decisions = HashMap::new();

    for key in keys {
        let mut any_active = false;
        let mut any_archived = false;

        for view in views {
            match view.presence_of(key) {
                Presence::Active => any_active = true,
                Presence::Archived => any_archived = true,
                Presence::Absent => {}
            }
        }

        let decision = if any_active {
            EligibilityDecision::Publish
        } else if any_archived {
            EligibilityDecision::DeniedArchived
        } else {
            EligibilityDecision::DeniedUnlisted
        };

        decisions.insert(key.clone(), decision);
    }

    decisions
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn art(s: &str) -> Article {
        Article::new(s)
    }

    fn available(pairs: &[(&str, Presence)]) -> AccountView {
        AccountView::Available(
            pairs.iter().map(|(a, p)| (art(a), *p)).collect(),
        )
    }

    #[test]
    fn absent_everywhere_is_denied() {
        let keys = [art("X1")];
        let views = [available(&[]), available(&[])];
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("X1")], EligibilityDecision::DeniedUnlisted);
        assert!(!decisions[&art("X1")].is_allowed());
    }

    #[test]
    fn active_beats_archive_elsewhere() {
        // Account 1 still sells the product, account 2 retired it: stock is
        // published under account 1's rule.
        let keys = [art("X1")];
        let views = [
            available(&[("X1", Presence::Active)]),
            available(&[("X1", Presence::Archived)]),
        ];
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("X1")], EligibilityDecision::Publish);
    }

    #[test]
    fn archived_with_no_active_listing_is_denied() {
        let keys = [art("X1")];
        let views = [
            available(&[("X1", Presence::Archived)]),
            available(&[]),
        ];
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("X1")], EligibilityDecision::DeniedArchived);
        assert!(!decisions[&art("X1")].is_allowed());
    }

    #[test]
    fn active_in_one_account_absent_in_other_is_published() {
        let keys = [art("X1")];
        let views = [
            available(&[("X1", Presence::Active)]),
            available(&[]),
        ];
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("X1")], EligibilityDecision::Publish);
    }

    #[test]
    fn unavailable_account_counts_as_absent_not_as_veto() {
        let keys = [art("X1")];
        let views = [
            available(&[("X1", Presence::Active)]),
            AccountView::Unavailable,
        ];
        let decisions = compute_eligibility(keys.iter(), &views);
        // The reachable account still allows the publish.
        assert_eq!(decisions[&art("X1")], EligibilityDecision::Publish);
    }

    #[test]
    fn all_accounts_unavailable_degrades_to_denied() {
        let keys = [art("X1")];
        let views = [AccountView::Unavailable, AccountView::Unavailable];
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("X1")], EligibilityDecision::DeniedUnlisted);
    }

    #[test]
    fn no_accounts_configured_denies_everything() {
        let keys = [art("X1"), art("X2")];
        let decisions = compute_eligibility(keys.iter(), &[]);
        assert!(decisions.values().all(|d| !d.is_allowed()));
    }

    #[test]
    fn cyrillic_and_latin_keys_share_one_decision() {
        // The Cyrillic spelling normalizes to the Latin key, so a state
        // reported under either spelling lands on the same entry.
        let keys = [art("А-01")]; // Cyrillic А
        let views = [available(&[("A-01", Presence::Active)])]; // Latin A
        let decisions = compute_eligibility(keys.iter(), &views);
        assert_eq!(decisions[&art("A-01")], EligibilityDecision::Publish);
    }

    #[test]
    fn unknown_vendor_state_deserializes_as_absent() {
        let p: Presence = serde_json::from_str("\"moderating\"").unwrap();
        assert_eq!(p, Presence::Absent);
        let p: Presence = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(p, Presence::Archived);
    }
}
