//! Article domain model.
//!
//! # Responsibility
//! - Define the canonical record for one RSS entry as persisted by the
//!   ingestion process and enriched by the pipeline.
//!
//! # Invariants
//! - `id` is the SQLite rowid and never reused for another article.
//! - `detected_language` starts as `"unknown"` until enrichment has
//!   examined the summary text.
//! - `original_summary` is only set when `is_translated` is true.

use serde::{Deserialize, Serialize};

/// Stable identifier for a persisted article row.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ArticleId = i64;

/// Placeholder body used when an article has no usable summary and
/// enrichment could not produce one.
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

/// Language tag recorded before enrichment has examined an article.
pub const LANGUAGE_UNKNOWN: &str = "unknown";

/// Canonical article record.
///
/// Rows are created by an external ingestion process; the pipeline only
/// mutates the enrichment fields (`summary`, `detected_language`,
/// `original_summary`, `is_translated`) and never deletes rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Stable numeric id assigned by storage.
    pub id: ArticleId,
    /// Feed-provided headline; may be missing for malformed entries.
    pub title: Option<String>,
    /// Unique source URL; the natural dedup key.
    pub link: String,
    /// Publish timestamp text as ingested. Ordering relies on
    /// lexicographic comparison of ISO-8601-style values.
    pub published: Option<String>,
    /// Body text used for narration. May be empty until enriched.
    pub summary: Option<String>,
    /// ISO-639-1 tag, or `"unknown"` before language detection.
    pub detected_language: String,
    /// Pre-translation body, kept when a translation replaced `summary`.
    pub original_summary: Option<String>,
    /// Whether `summary` holds translated text.
    pub is_translated: bool,
}

impl Article {
    /// Returns whether the article has a usable body for narration.
    ///
    /// Whitespace-only summaries and the placeholder text count as
    /// missing; both are candidates for enrichment.
    pub fn has_summary(&self) -> bool {
        match self.summary.as_deref() {
            Some(text) => {
                let trimmed = text.trim();
                !trimmed.is_empty() && trimmed != NO_SUMMARY_PLACEHOLDER
            }
            None => false,
        }
    }

    /// Title for narration and logs, falling back for untitled entries.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "No title",
        }
    }
}

/// Write model for inserting one article at the ingestion boundary.
///
/// Enrichment fields are intentionally absent: new rows always start
/// with `detected_language = "unknown"` and no translation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub title: Option<String>,
    pub link: String,
    pub published: Option<String>,
    pub summary: Option<String>,
}

impl NewArticle {
    /// Creates an insert request for the given source link.
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }
}
