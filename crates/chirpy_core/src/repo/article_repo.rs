//! Article store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the single source of truth for "is this article read".
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Unread selection is an anti-join against `read_articles`; an
//!   article is never counted in zero or two categories.
//! - `mark_read` relies on `INSERT OR IGNORE` + UNIQUE(article_id), not
//!   on a pre-check, so a repeated mark is a reported no-op.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::article::{Article, ArticleId, NewArticle, NO_SUMMARY_PLACEHOLDER};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ARTICLE_SELECT_SQL: &str = "SELECT
    a.id,
    a.title,
    a.link,
    a.published,
    a.summary,
    a.detected_language,
    a.original_summary,
    a.is_translated
FROM articles a";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for article persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(String),
    Db(DbError),
    NotFound(ArticleId),
    DuplicateLink(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "article not found: {id}"),
            Self::DuplicateLink(link) => write!(f, "article link already exists: {link}"),
            Self::InvalidData(message) => write!(f, "invalid persisted article data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::DuplicateLink(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of one mark-read command.
///
/// `AlreadyRead` is a successful no-op, reported distinctly so callers
/// can observe idempotent re-marks without treating them as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyRead,
}

/// Aggregate counts over articles and read state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleStats {
    pub total: u64,
    pub read: u64,
    pub unread: u64,
    pub empty_summaries: u64,
}

/// Storage interface for article and read-state operations.
///
/// The store owns both entities exclusively; orchestration code never
/// touches the connection directly.
pub trait ArticleStore {
    /// Total article count.
    fn count_total(&self) -> RepoResult<u64>;
    /// Articles with a read mark.
    fn count_read(&self) -> RepoResult<u64>;
    /// Articles without a read mark (anti-join).
    fn count_unread(&self) -> RepoResult<u64>;
    /// All aggregate counts in one call.
    fn stats(&self) -> RepoResult<ArticleStats>;
    /// Up to `limit` unread articles, most recently published first,
    /// ties broken by id descending.
    fn fetch_unread(&self, limit: u32) -> RepoResult<Vec<Article>>;
    /// Inserts a read mark. Idempotent; marking an unknown id fails
    /// with `NotFound` via the foreign key constraint.
    fn mark_read(&self, id: ArticleId) -> RepoResult<MarkOutcome>;
    /// Overwrites the enrichment fields of an existing article.
    fn update_article_content(
        &self,
        id: ArticleId,
        summary: &str,
        detected_language: &str,
        original_summary: Option<&str>,
        is_translated: bool,
    ) -> RepoResult<()>;
    /// Articles whose summary is missing, whitespace-only or the
    /// placeholder text, for batch enrichment.
    fn find_empty_summaries(&self, limit: u32) -> RepoResult<Vec<Article>>;
    /// Articles with a usable summary whose language has not been
    /// examined yet, for batch translation.
    fn find_untranslated(&self, limit: u32) -> RepoResult<Vec<Article>>;
    /// Gets one article by id.
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    /// Inserts one article at the ingestion boundary, enforcing the
    /// unique-link invariant.
    fn insert_article(&self, article: &NewArticle) -> RepoResult<ArticleId>;
}

/// SQLite-backed article store.
pub struct SqliteArticleStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ArticleStore for SqliteArticleStore<'_> {
    fn count_total(&self) -> RepoResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_read(&self) -> RepoResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM articles a
             JOIN read_articles r ON a.id = r.article_id;",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_unread(&self) -> RepoResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM articles a
             LEFT JOIN read_articles r ON a.id = r.article_id
             WHERE r.article_id IS NULL;",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn stats(&self) -> RepoResult<ArticleStats> {
        let empty_summaries = self.conn.query_row(
            "SELECT COUNT(*)
             FROM articles
             WHERE summary IS NULL OR TRIM(summary) = '' OR summary = ?1;",
            [NO_SUMMARY_PLACEHOLDER],
            |row| row.get(0),
        )?;

        Ok(ArticleStats {
            total: self.count_total()?,
            read: self.count_read()?,
            unread: self.count_unread()?,
            empty_summaries,
        })
    }

    fn fetch_unread(&self, limit: u32) -> RepoResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             LEFT JOIN read_articles r ON a.id = r.article_id
             WHERE r.article_id IS NULL
             ORDER BY a.published DESC, a.id DESC
             LIMIT ?1;"
        ))?;

        let rows = stmt.query(params![limit])?;
        collect_articles(rows)
    }

    fn mark_read(&self, id: ArticleId) -> RepoResult<MarkOutcome> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO read_articles (article_id) VALUES (?1);",
                params![id],
            )
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    RepoError::NotFound(id)
                } else {
                    RepoError::from(err)
                }
            })?;

        if changed == 0 {
            Ok(MarkOutcome::AlreadyRead)
        } else {
            Ok(MarkOutcome::Marked)
        }
    }

    fn update_article_content(
        &self,
        id: ArticleId,
        summary: &str,
        detected_language: &str,
        original_summary: Option<&str>,
        is_translated: bool,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                summary = ?2,
                detected_language = ?3,
                original_summary = ?4,
                is_translated = ?5
             WHERE id = ?1;",
            params![
                id,
                summary,
                detected_language,
                original_summary,
                bool_to_int(is_translated),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn find_empty_summaries(&self, limit: u32) -> RepoResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             WHERE (a.summary IS NULL OR TRIM(a.summary) = '' OR a.summary = ?1)
               AND a.link IS NOT NULL
               AND a.link != ''
             ORDER BY a.published DESC, a.id DESC
             LIMIT ?2;"
        ))?;

        let rows = stmt.query(params![NO_SUMMARY_PLACEHOLDER, limit])?;
        collect_articles(rows)
    }

    fn find_untranslated(&self, limit: u32) -> RepoResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             WHERE a.detected_language = 'unknown'
               AND a.summary IS NOT NULL
               AND TRIM(a.summary) != ''
               AND a.summary != ?1
             ORDER BY a.published DESC, a.id DESC
             LIMIT ?2;"
        ))?;

        let rows = stmt.query(params![NO_SUMMARY_PLACEHOLDER, limit])?;
        collect_articles(rows)
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE a.id = ?1;"))?;

        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }

        Ok(None)
    }

    fn insert_article(&self, article: &NewArticle) -> RepoResult<ArticleId> {
        if article.link.trim().is_empty() {
            return Err(RepoError::Validation(
                "article link must not be empty".to_string(),
            ));
        }

        self.conn
            .execute(
                "INSERT INTO articles (title, link, published, summary)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    article.title.as_deref(),
                    article.link.as_str(),
                    article.published.as_deref(),
                    article.summary.as_deref(),
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RepoError::DuplicateLink(article.link.clone())
                } else {
                    RepoError::from(err)
                }
            })?;

        Ok(self.conn.last_insert_rowid())
    }
}

fn collect_articles(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Article>> {
    let mut articles = Vec::new();
    while let Some(row) = rows.next()? {
        articles.push(parse_article_row(row)?);
    }
    Ok(articles)
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let is_translated = match row.get::<_, i64>("is_translated")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_translated value `{other}` in articles.is_translated"
            )));
        }
    };

    Ok(Article {
        id: row.get("id")?,
        title: row.get("title")?,
        link: row.get("link")?,
        published: row.get("published")?,
        summary: row.get("summary")?,
        detected_language: row.get("detected_language")?,
        original_summary: row.get("original_summary")?,
        is_translated,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
