//! Core domain logic for Chirpy.
//! This crate is the single source of truth for session and read-state invariants.

pub mod config;
pub mod db;
pub mod enrichment;
pub mod logging;
pub mod model;
pub mod narration;
pub mod repo;
pub mod service;

pub use config::{load_env_file, AppConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use enrichment::{EnrichmentClient, EnrichmentError, OpenAiEnrichment};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::article::{Article, ArticleId, NewArticle};
pub use narration::{NarrationAdapter, NarrationOutcome, Narrator};
pub use repo::article_repo::{
    ArticleStats, ArticleStore, MarkOutcome, RepoError, RepoResult, SqliteArticleStore,
};
pub use service::{format_narration_text, SessionOptions, SessionReport, SessionService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
