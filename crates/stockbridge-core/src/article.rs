//! # Article Normalization
//!
//! Canonicalizes product article codes across visually-confusable character
//! sets.
//!
//! ## The Problem
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Why Articles Need Normalization                      │
//! │                                                                         │
//! │  Marketplace account A:   "А-01"   (Cyrillic А, typed on a RU layout)  │
//! │  Marketplace account B:   "A-01"   (Latin A, typed on an EN layout)    │
//! │  Inventory backend:       " A-01 " (Latin A, stray whitespace)         │
//! │                                                                         │
//! │  All three are THE SAME product. Every cross-account match in the      │
//! │  engine (eligibility, stock push, order line resolution) goes through  │
//! │  Article::new() so the three spellings collapse into one key.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Total: normalization never fails; unmapped characters pass through
//! 2. Idempotent: `Article::new(a.as_str()) == a` for any article `a`
//! 3. Case-preserving: `А` → `A`, `а` → `a`

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Confusable Substitution
// =============================================================================

/// Maps a Cyrillic homoglyph to its Latin equivalent.
///
/// Only letters that are visually identical to a Latin letter are mapped;
/// everything else passes through unchanged. The output alphabet is Latin,
/// which is what makes normalization idempotent: a normalized string contains
/// no characters in the map's domain.
const fn substitute(c: char) -> char {
    match c {
        // Uppercase homoglyphs
        'А' => 'A',
        'В' => 'B',
        'Е' => 'E',
        'К' => 'K',
        'М' => 'M',
        'Н' => 'H',
        'О' => 'O',
        'Р' => 'P',
        'С' => 'C',
        'Т' => 'T',
        'У' => 'Y',
        'Х' => 'X',
        // Lowercase homoglyphs
        'а' => 'a',
        'е' => 'e',
        'к' => 'k',
        'о' => 'o',
        'р' => 'p',
        'с' => 'c',
        'у' => 'y',
        'х' => 'x',
        other => other,
    }
}

// =============================================================================
// Article
// =============================================================================

/// A normalized product article code.
///
/// This is the canonical key for all cross-system product matching. Two raw
/// articles that normalize to the same `Article` are the same product for
/// sync purposes.
///
/// Construction always normalizes, so an `Article` value is normalized by
/// construction - there is no way to hold a raw article in this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Article(String);

impl Article {
    /// Normalizes a raw article code into its canonical form.
    ///
    /// Applies the confusable substitution map character-by-character, then
    /// trims surrounding whitespace. Total and pure: any input produces a
    /// valid `Article`.
    pub fn new(raw: &str) -> Self {
        Article(raw.trim().chars().map(substitute).collect())
    }

    /// Returns the canonical key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the raw input contained nothing but whitespace.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the article, returning the canonical key.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Article {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Article {
    fn from(raw: &str) -> Self {
        Article::new(raw)
    }
}

// Deserialization goes through `Article::new` so keys read from config or
// wire payloads are normalized like everything else.
impl<'de> Deserialize<'de> for Article {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Article::new(&raw))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
