//! Narration session orchestration.
//!
//! # Responsibility
//! - Drive one read-aloud session end-to-end: select unread articles,
//!   enrich and translate them as needed, narrate, mark read.
//! - Provide the batch enrichment entry points used by the CLI modes.
//!
//! # Invariants
//! - Articles are processed strictly in the order the store returns them.
//! - Enrichment and narration failures never abort a session; only storage
//!   transport faults propagate.
//! - An article is marked read only after its narration succeeded.
//! - Batch counters report persisted updates only; an enrichment result
//!   that failed to write does not count.

use crate::config::AppConfig;
use crate::enrichment::EnrichmentClient;
use crate::model::article::{Article, ArticleId, LANGUAGE_UNKNOWN, NO_SUMMARY_PLACEHOLDER};
use crate::narration::Narrator;
use crate::repo::article_repo::{ArticleStore, MarkOutcome, RepoError, RepoResult};
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;

/// Fixed pause between narrated articles, in seconds.
const PAUSE_BETWEEN_ARTICLES_SECS: u64 = 2;

/// Tunables for one session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Maximum number of unread articles narrated per session.
    pub max_articles: u32,
    /// Cap on narrated summary length, in characters.
    pub max_summary_length: usize,
    /// Whether narrated articles are marked read afterwards.
    pub auto_mark_read: bool,
    /// Whether a pause separates narrated articles.
    pub pause_between_articles: bool,
    /// Pause length between narrated articles, in seconds.
    pub pause_secs: u64,
    /// Pause between consecutive enrichment calls in batch modes, in seconds.
    pub rate_limit_secs: u64,
    /// Whether foreign-language summaries are translated before narration.
    pub auto_translate: bool,
    /// Language tag summaries are translated into.
    pub target_language: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_articles: 3,
            max_summary_length: 500,
            auto_mark_read: true,
            pause_between_articles: true,
            pause_secs: PAUSE_BETWEEN_ARTICLES_SECS,
            rate_limit_secs: 2,
            auto_translate: true,
            target_language: "ja".to_string(),
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_articles: config.max_articles,
            max_summary_length: config.max_summary_length,
            auto_mark_read: config.auto_mark_read,
            pause_between_articles: config.pause_between_articles,
            pause_secs: PAUSE_BETWEEN_ARTICLES_SECS,
            rate_limit_secs: config.rate_limit_secs,
            auto_translate: config.auto_translate,
            target_language: config.target_language.clone(),
        }
    }
}

/// Counters reported at the end of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Articles narrated successfully.
    pub processed: u32,
    /// Articles skipped because narration failed.
    pub skipped: u32,
}

/// Session orchestrator over the three collaborators.
pub struct SessionService<S, E, N>
where
    S: ArticleStore,
    E: EnrichmentClient,
    N: Narrator,
{
    store: S,
    enrichment: E,
    narrator: N,
    options: SessionOptions,
}

impl<S, E, N> SessionService<S, E, N>
where
    S: ArticleStore,
    E: EnrichmentClient,
    N: Narrator,
{
    /// Creates a service from explicit collaborators.
    pub fn new(store: S, enrichment: E, narrator: N, options: SessionOptions) -> Self {
        Self {
            store,
            enrichment,
            narrator,
            options,
        }
    }

    /// Runs one narration session.
    ///
    /// # Contract
    /// - `max_articles == 0` ends immediately without touching the store.
    /// - Narration failure skips the article (not marked read) and continues.
    /// - Returns `Err` only for storage transport faults.
    pub fn run_session(&self) -> RepoResult<SessionReport> {
        if self.options.max_articles == 0 {
            info!("event=session module=service status=skipped reason=zero_limit");
            return Ok(SessionReport::default());
        }

        let stats = self.store.stats()?;
        info!(
            "event=session_stats module=service total={} read={} unread={} empty_summaries={}",
            stats.total, stats.read, stats.unread, stats.empty_summaries
        );

        if stats.unread == 0 {
            info!("event=session module=service status=ok reason=all_caught_up");
            self.narrator.speak("No unread articles found. All caught up!");
            return Ok(SessionReport::default());
        }

        let mut articles = self.store.fetch_unread(self.options.max_articles)?;
        if articles.is_empty() {
            warn!("event=session module=service status=empty reason=no_unread_rows");
            return Ok(SessionReport::default());
        }

        let intro = format!(
            "Welcome to Chirpy! I found {} articles to read for you.",
            articles.len()
        );
        self.narrator.speak(&intro);

        let mut report = SessionReport::default();
        let last_index = articles.len() - 1;
        for (index, article) in articles.iter_mut().enumerate() {
            info!(
                "event=article module=service status=start position={}/{} id={}",
                index + 1,
                last_index + 1,
                article.id
            );

            self.enrich_missing_summary(article);
            self.translate_if_needed(article);

            let summary = article
                .summary
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(NO_SUMMARY_PLACEHOLDER);
            let text = format_narration_text(
                article.display_title(),
                summary,
                self.options.max_summary_length,
            );

            let outcome = self.narrator.speak(&text);
            if outcome.is_failure() {
                error!(
                    "event=article module=service status=skipped id={} reason=narration_failed",
                    article.id
                );
                report.skipped += 1;
                continue;
            }

            report.processed += 1;
            if self.options.auto_mark_read {
                self.mark_article_read(article.id)?;
            }

            if index < last_index && self.options.pause_between_articles {
                debug!(
                    "event=article_pause module=service secs={}",
                    self.options.pause_secs
                );
                thread::sleep(Duration::from_secs(self.options.pause_secs));
            }
        }

        let outro = format!(
            "That's all for now! I've read {} articles for you.",
            report.processed
        );
        self.narrator.speak(&outro);
        info!(
            "event=session module=service status=ok processed={} skipped={}",
            report.processed, report.skipped
        );
        Ok(report)
    }

    /// Fetches and summarizes up to `limit` articles lacking a summary.
    ///
    /// Returns the number of articles whose new summary was persisted.
    /// Unavailable enrichment short-circuits with zero.
    pub fn process_empty_summaries(&self, limit: u32) -> RepoResult<u32> {
        if !self.enrichment.is_available() {
            warn!("event=batch_summaries module=service status=skipped reason=enrichment_unavailable");
            return Ok(0);
        }

        let mut articles = self.store.find_empty_summaries(limit)?;
        info!(
            "event=batch_summaries module=service status=start count={}",
            articles.len()
        );

        let mut updated = 0;
        let last_index = articles.len().saturating_sub(1);
        for (index, article) in articles.iter_mut().enumerate() {
            if self.enrich_missing_summary(article) {
                updated += 1;
            }
            self.pause_between_requests(index, last_index);
        }

        info!("event=batch_summaries module=service status=ok updated={updated}");
        Ok(updated)
    }

    /// Detects language and translates up to `limit` pending articles.
    ///
    /// Returns the number of articles whose translation was persisted.
    /// Unavailable enrichment short-circuits with zero.
    pub fn translate_pending(&self, limit: u32) -> RepoResult<u32> {
        if !self.enrichment.is_available() {
            warn!("event=batch_translate module=service status=skipped reason=enrichment_unavailable");
            return Ok(0);
        }

        let mut articles = self.store.find_untranslated(limit)?;
        info!(
            "event=batch_translate module=service status=start count={}",
            articles.len()
        );

        let mut translated = 0;
        let last_index = articles.len().saturating_sub(1);
        for (index, article) in articles.iter_mut().enumerate() {
            if self.translate_article(article) {
                translated += 1;
            }
            self.pause_between_requests(index, last_index);
        }

        info!("event=batch_translate module=service status=ok translated={translated}");
        Ok(translated)
    }

    /// Fills a missing summary from the article page.
    ///
    /// Persists on success and merges the result in-memory either way, so
    /// narration can proceed when only the write failed. Returns whether
    /// the new summary was persisted.
    fn enrich_missing_summary(&self, article: &mut Article) -> bool {
        if article.has_summary() {
            return false;
        }
        if article.link.trim().is_empty() {
            warn!(
                "event=enrich module=service status=skipped id={} reason=missing_link",
                article.id
            );
            return false;
        }

        match self
            .enrichment
            .fetch_and_summarize(&article.link, article.display_title())
        {
            Ok(summary) => {
                let persisted = match self.store.update_article_content(
                    article.id,
                    &summary,
                    LANGUAGE_UNKNOWN,
                    None,
                    false,
                ) {
                    Ok(()) => {
                        info!("event=enrich module=service status=ok id={}", article.id);
                        true
                    }
                    Err(err) => {
                        warn!(
                            "event=enrich module=service status=persist_failed id={} details={err}",
                            article.id
                        );
                        false
                    }
                };
                article.summary = Some(summary);
                article.detected_language = LANGUAGE_UNKNOWN.to_string();
                article.original_summary = None;
                article.is_translated = false;
                persisted
            }
            Err(err) => {
                warn!(
                    "event=enrich module=service status=error id={} details={err}",
                    article.id
                );
                false
            }
        }
    }

    /// Applies the translation workflow when session options call for it.
    fn translate_if_needed(&self, article: &mut Article) {
        if !self.options.auto_translate || !self.enrichment.is_available() {
            return;
        }
        self.translate_article(article);
    }

    /// Detects the summary language and translates into the target language.
    ///
    /// Detection equal to the target records the language without touching
    /// the summary. Inconclusive detection and enrichment failures leave the
    /// article untouched; a failed write after successful enrichment still
    /// merges in-memory so narration uses the enriched text. Returns whether
    /// a translated summary was persisted.
    fn translate_article(&self, article: &mut Article) -> bool {
        let target = self.options.target_language.as_str();
        if article.is_translated || article.detected_language == target || !article.has_summary()
        {
            return false;
        }
        let Some(text) = article.summary.clone() else {
            return false;
        };

        let detected = match self.enrichment.detect_language(&text) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(
                    "event=translate module=service status=detect_failed id={} details={err}",
                    article.id
                );
                return false;
            }
        };
        if detected == LANGUAGE_UNKNOWN {
            debug!(
                "event=translate module=service status=inconclusive id={}",
                article.id
            );
            return false;
        }

        if detected == target {
            if let Err(err) =
                self.store
                    .update_article_content(article.id, &text, &detected, None, false)
            {
                warn!(
                    "event=translate module=service status=persist_failed id={} details={err}",
                    article.id
                );
            }
            info!(
                "event=translate module=service status=not_needed id={} language={detected}",
                article.id
            );
            article.detected_language = detected;
            return false;
        }

        match self.enrichment.translate(&text, target) {
            Ok(translated) => {
                let persisted = match self.store.update_article_content(
                    article.id,
                    &translated,
                    &detected,
                    Some(&text),
                    true,
                ) {
                    Ok(()) => {
                        info!(
                            "event=translate module=service status=ok id={} from={detected} to={target}",
                            article.id
                        );
                        true
                    }
                    Err(err) => {
                        warn!(
                            "event=translate module=service status=persist_failed id={} details={err}",
                            article.id
                        );
                        false
                    }
                };
                article.summary = Some(translated);
                article.detected_language = detected;
                article.original_summary = Some(text);
                article.is_translated = true;
                persisted
            }
            Err(err) => {
                warn!(
                    "event=translate module=service status=error id={} details={err}",
                    article.id
                );
                false
            }
        }
    }

    /// Marks one article read, tolerating repeats and unknown ids.
    fn mark_article_read(&self, article_id: ArticleId) -> RepoResult<()> {
        match self.store.mark_read(article_id) {
            Ok(MarkOutcome::Marked) => {
                debug!("event=mark_read module=service status=ok id={article_id}");
                Ok(())
            }
            Ok(MarkOutcome::AlreadyRead) => {
                debug!("event=mark_read module=service status=already_read id={article_id}");
                Ok(())
            }
            Err(RepoError::NotFound(id)) => {
                warn!("event=mark_read module=service status=not_found id={id}");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn pause_between_requests(&self, index: usize, last_index: usize) {
        if index < last_index && self.options.rate_limit_secs > 0 {
            debug!(
                "event=rate_limit module=service secs={}",
                self.options.rate_limit_secs
            );
            thread::sleep(Duration::from_secs(self.options.rate_limit_secs));
        }
    }
}

/// Formats one article into the narrated utterance.
///
/// Rules:
/// - Newlines and whitespace runs in `summary` collapse to single spaces.
/// - `summary` is cut at `max_chars` characters with an ellipsis appended
///   when over the limit.
pub fn format_narration_text(title: &str, summary: &str, max_chars: usize) -> String {
    let normalized = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    let clipped = if normalized.chars().count() > max_chars {
        let mut cut: String = normalized.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        normalized
    };
    format!("Article title: {title}. Content: {clipped}")
}

#[cfg(test)]
mod tests {
    use super::format_narration_text;

    #[test]
    fn format_truncates_long_summaries_to_the_limit() {
        let summary = "x".repeat(600);
        let text = format_narration_text("Title", &summary, 500);
        let content = text
            .strip_prefix("Article title: Title. Content: ")
            .expect("formatted prefix should match");
        assert!(content.ends_with("..."));
        assert_eq!(content.chars().count(), 503);
    }

    #[test]
    fn format_leaves_short_summaries_untouched() {
        let text = format_narration_text("Title", "short text", 500);
        assert_eq!(text, "Article title: Title. Content: short text");
    }

    #[test]
    fn format_collapses_newlines_and_whitespace_runs() {
        let text = format_narration_text("T", "line one\n\nline   two\r\nend", 500);
        assert_eq!(text, "Article title: T. Content: line one line two end");
    }

    #[test]
    fn format_counts_characters_not_bytes() {
        let summary = "あ".repeat(510);
        let text = format_narration_text("T", &summary, 500);
        let content = text
            .strip_prefix("Article title: T. Content: ")
            .expect("formatted prefix should match");
        assert_eq!(content.chars().count(), 503);
        assert!(content.ends_with("..."));
    }
}
