//! Remote enrichment for articles with missing or foreign-language summaries.
//!
//! # Responsibility
//! - Fetch article pages over HTTP and reduce them to narration-ready text.
//! - Summarize, language-detect and translate text through a chat-completion
//!   backend.

pub mod client;

pub use client::{EnrichmentClient, EnrichmentError, EnrichmentResult, OpenAiEnrichment};
