//! Domain model for the article narration pipeline.
//!
//! # Responsibility
//! - Define the canonical article record shared by store, enrichment and
//!   session orchestration.
//!
//! # Invariants
//! - Every article is identified by a stable numeric `ArticleId`.
//! - `link` is the natural dedup key and is never empty.

pub mod article;
