//! OpenAI-backed enrichment client.
//!
//! # Responsibility
//! - Download article pages and strip them to plain text.
//! - Run summarize / detect-language / translate completions.
//!
//! # Invariants
//! - Availability is decided once at construction from the API key; calls on
//!   an unavailable client fail fast with [`EnrichmentError::Unavailable`].
//! - Backend failures surface as typed errors; callers decide whether to
//!   skip or abort.

use crate::config::AppConfig;
use crate::model::article::LANGUAGE_UNKNOWN;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Browser-style user agent; several article hosts reject the default one.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Upper bound on extracted page text forwarded to the completion API.
const MAX_PAGE_TEXT_CHARS: usize = 8000;

/// Upper bound on the text sample sent for language detection.
const DETECTION_SAMPLE_CHARS: usize = 500;

/// Token budget for the single-tag language-detection completion.
const DETECTION_MAX_TOKENS: u32 = 10;

static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex"));
static STYLE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Result type for enrichment APIs.
pub type EnrichmentResult<T> = Result<T, EnrichmentError>;

/// Enrichment-layer error for HTTP transport and backend responses.
#[derive(Debug)]
pub enum EnrichmentError {
    /// No API key was configured; completion calls cannot be made.
    Unavailable,
    /// Transport-level failure (connect, timeout, body decode).
    Http(reqwest::Error),
    /// Non-success HTTP status from the page host or the backend.
    UnexpectedStatus(u16),
    /// Fetched page contained no readable text.
    NoContent,
    /// Backend response carried no usable completion text.
    EmptyCompletion,
}

impl Display for EnrichmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "enrichment unavailable: OPENAI_API_KEY is not set"),
            Self::Http(err) => write!(f, "{err}"),
            Self::UnexpectedStatus(code) => write!(f, "unexpected HTTP status {code}"),
            Self::NoContent => write!(f, "no readable content in fetched page"),
            Self::EmptyCompletion => write!(f, "empty completion from backend"),
        }
    }
}

impl Error for EnrichmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Remote enrichment operations used by session workflows.
///
/// # Contract
/// - All calls block until the backend answers or the timeout fires.
/// - Implementations never panic on backend failures.
pub trait EnrichmentClient {
    /// Fetches the article page at `url` and produces a narration-ready
    /// summary in the configured target language.
    fn fetch_and_summarize(&self, url: &str, title: &str) -> EnrichmentResult<String>;

    /// Identifies the language of `text` as a lowercase ISO 639-1 style tag.
    fn detect_language(&self, text: &str) -> EnrichmentResult<String>;

    /// Translates `text` into `target_language`, returning the translation
    /// only.
    fn translate(&self, text: &str, target_language: &str) -> EnrichmentResult<String>;

    /// Whether completion calls can be made at all.
    fn is_available(&self) -> bool;
}

/// Chat-completions client over blocking HTTP.
pub struct OpenAiEnrichment {
    http: Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    target_language: String,
}

impl OpenAiEnrichment {
    /// Builds the client from resolved configuration.
    ///
    /// A missing API key still yields a usable value whose completion calls
    /// fail with [`EnrichmentError::Unavailable`].
    pub fn new(config: &AppConfig) -> EnrichmentResult<Self> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        if config.openai_api_key.is_none() {
            warn!("event=enrichment_init module=enrichment status=degraded reason=missing_api_key");
        }
        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_tokens: config.openai_max_tokens,
            temperature: config.openai_temperature,
            target_language: config.target_language.clone(),
        })
    }

    /// Downloads `url` and reduces the HTML body to readable text.
    fn fetch_page_text(&self, url: &str) -> EnrichmentResult<String> {
        info!("event=page_fetch module=enrichment status=start url={url}");
        let response = self
            .http
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "ja,en-US;q=0.9,en;q=0.8")
            .send()?;
        let status = response.status();
        if !status.is_success() {
            warn!("event=page_fetch module=enrichment status=error code={status}");
            return Err(EnrichmentError::UnexpectedStatus(status.as_u16()));
        }
        let body = response.text()?;
        let text = html_to_text(&body);
        if text.is_empty() {
            return Err(EnrichmentError::NoContent);
        }
        info!(
            "event=page_fetch module=enrichment status=ok chars={}",
            text.chars().count()
        );
        Ok(text)
    }

    /// Produces a 2-3 paragraph summary in the configured target language.
    fn summarize(&self, content: &str, title: &str) -> EnrichmentResult<String> {
        let language = language_name(&self.target_language);
        let system = format!(
            "You are a helpful assistant that creates concise, accurate summaries \
             of articles in {language}. Your summaries should be informative and \
             suitable for audio reading."
        );
        let prompt = format!(
            "Please summarize the following article in {language}. Create a concise \
             but comprehensive summary that captures the main points and key \
             information.\n\nTitle: {title}\n\nContent: {content}\n\nPlease provide \
             a summary in 2-3 paragraphs that would be suitable for text-to-speech \
             reading."
        );
        self.chat(&system, &prompt, self.max_tokens)
    }

    /// Runs one chat completion and returns the trimmed assistant text.
    fn chat(&self, system: &str, user: &str, max_tokens: u32) -> EnrichmentResult<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EnrichmentError::Unavailable);
        };

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens,
        };

        debug!(
            "event=completion module=enrichment status=start model={}",
            self.model
        );
        let response = self
            .http
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&req)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            warn!("event=completion module=enrichment status=error code={status}");
            return Err(EnrichmentError::UnexpectedStatus(status.as_u16()));
        }
        let body: Resp = response.json()?;
        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.trim())
            .unwrap_or("");
        if content.is_empty() {
            return Err(EnrichmentError::EmptyCompletion);
        }
        Ok(content.to_string())
    }
}

impl EnrichmentClient for OpenAiEnrichment {
    fn fetch_and_summarize(&self, url: &str, title: &str) -> EnrichmentResult<String> {
        if self.api_key.is_none() {
            return Err(EnrichmentError::Unavailable);
        }
        let page_text = self.fetch_page_text(url)?;
        self.summarize(&page_text, title)
    }

    fn detect_language(&self, text: &str) -> EnrichmentResult<String> {
        let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();
        let raw = self.chat(
            "You identify languages. Answer with the two-letter ISO 639-1 code of \
             the user's text and nothing else. Answer `unknown` if you cannot tell.",
            &sample,
            DETECTION_MAX_TOKENS,
        )?;
        Ok(normalize_language_tag(&raw))
    }

    fn translate(&self, text: &str, target_language: &str) -> EnrichmentResult<String> {
        let language = language_name(target_language);
        let system = format!(
            "You are a professional translator. Translate the user's text into \
             {language}. Reply with the translation only, no commentary."
        );
        self.chat(&system, text, self.max_tokens)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Reduces raw HTML to whitespace-normalized text.
///
/// Rules:
/// - `script` and `style` blocks are dropped before tag stripping.
/// - Common entities are decoded.
/// - Output is capped at [`MAX_PAGE_TEXT_CHARS`] chars plus an ellipsis.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK_RE.replace_all(html, " ");
    let without_styles = STYLE_BLOCK_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    let decoded = decode_entities(&without_tags);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_PAGE_TEXT_CHARS {
        let mut capped: String = collapsed.chars().take(MAX_PAGE_TEXT_CHARS).collect();
        capped.push_str("...");
        capped
    } else {
        collapsed
    }
}

/// Normalizes a model reply into a lowercase language tag.
///
/// Keeps ASCII letters and hyphens from the first whitespace-separated token;
/// anything implausible collapses to `unknown`.
pub fn normalize_language_tag(raw: &str) -> String {
    let token = raw.split_whitespace().next().unwrap_or("");
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.len() < 2 || cleaned.len() > 16 {
        return LANGUAGE_UNKNOWN.to_string();
    }
    cleaned
}

// `&amp;` decodes last so `&amp;lt;` resolves in one pass.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Maps a language tag to the English name used in prompts.
fn language_name(tag: &str) -> String {
    match tag.to_ascii_lowercase().as_str() {
        "ja" => "Japanese".to_string(),
        "en" => "English".to_string(),
        "zh" => "Chinese".to_string(),
        "ko" => "Korean".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        other => other.to_string(),
    }
}
