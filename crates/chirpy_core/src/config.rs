//! Runtime configuration loaded from environment variables.
//!
//! # Responsibility
//! - Define every tunable with its default in one place.
//! - Parse environment overrides leniently: a bad value logs a warning and
//!   keeps the default instead of failing startup.
//!
//! # Invariants
//! - `AppConfig` is immutable after startup; sessions never re-read the env.
//! - Numeric fields are clamped to their documented ranges by
//!   [`AppConfig::clamp`], which callers re-run after applying CLI overrides.

use log::warn;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default SQLite database location relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "data/articles.db";

/// Immutable runtime settings for one process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite database file path.
    pub database_path: PathBuf,
    /// Maximum number of unread articles narrated per session.
    pub max_articles: u32,
    /// Cap on narrated summary length, in characters.
    pub max_summary_length: usize,
    /// API key for the enrichment backend. `None` disables enrichment.
    pub openai_api_key: Option<String>,
    /// Chat-completion model identifier.
    pub openai_model: String,
    /// Token budget for one completion request.
    pub openai_max_tokens: u32,
    /// Sampling temperature passed through to the completion API.
    pub openai_temperature: f32,
    /// Primary speech program, `say` or `espeak`.
    pub tts_engine: String,
    /// Optional voice identifier understood by the speech program.
    pub tts_voice: Option<String>,
    /// Speech rate in words per minute.
    pub tts_rate: u32,
    /// Output volume in `0.0..=1.0`.
    pub tts_volume: f32,
    /// HTTP timeout for article fetches, in seconds.
    pub fetch_timeout_secs: u64,
    /// Pause between consecutive remote API calls, in seconds.
    pub rate_limit_secs: u64,
    /// Log filter level name (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    /// Log directory; `None` keeps logging on stderr only.
    pub log_dir: Option<String>,
    /// Whether narrated articles are marked read afterwards.
    pub auto_mark_read: bool,
    /// Whether a short pause separates narrated articles.
    pub pause_between_articles: bool,
    /// Whether narration is attempted at all.
    pub speech_enabled: bool,
    /// Whether foreign-language summaries are translated before narration.
    pub auto_translate: bool,
    /// Language tag summaries are translated into.
    pub target_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_articles: 3,
            max_summary_length: 500,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_max_tokens: 500,
            openai_temperature: 0.3,
            tts_engine: default_tts_engine().to_string(),
            tts_voice: None,
            tts_rate: 180,
            tts_volume: 0.9,
            fetch_timeout_secs: 30,
            rate_limit_secs: 2,
            log_level: "info".to_string(),
            log_dir: None,
            auto_mark_read: true,
            pause_between_articles: true,
            speech_enabled: true,
            auto_translate: true,
            target_language: "ja".to_string(),
        }
    }
}

impl AppConfig {
    /// Builds a configuration from the process environment.
    ///
    /// Missing variables keep their defaults. Unparsable numeric or boolean
    /// values log a warning and keep the default instead of failing startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            database_path: env::var("CHIRPY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_articles: env_parsed("CHIRPY_MAX_ARTICLES", defaults.max_articles),
            max_summary_length: env_parsed("CHIRPY_MAX_SUMMARY_LENGTH", defaults.max_summary_length),
            openai_api_key: env_non_empty("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_max_tokens: env_parsed("OPENAI_MAX_TOKENS", defaults.openai_max_tokens),
            openai_temperature: env_parsed("OPENAI_TEMPERATURE", defaults.openai_temperature),
            tts_engine: env::var("TTS_ENGINE").unwrap_or(defaults.tts_engine),
            tts_voice: env_non_empty("TTS_VOICE"),
            tts_rate: env_parsed("TTS_RATE", defaults.tts_rate),
            tts_volume: env_parsed("TTS_VOLUME", defaults.tts_volume),
            fetch_timeout_secs: env_parsed("FETCH_TIMEOUT", defaults.fetch_timeout_secs),
            rate_limit_secs: env_parsed("RATE_LIMIT_DELAY", defaults.rate_limit_secs),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: env_non_empty("LOG_DIR"),
            auto_mark_read: env_bool("AUTO_MARK_READ", defaults.auto_mark_read),
            pause_between_articles: env_bool(
                "PAUSE_BETWEEN_ARTICLES",
                defaults.pause_between_articles,
            ),
            speech_enabled: env_bool("SPEECH_ENABLED", defaults.speech_enabled),
            auto_translate: env_bool("AUTO_TRANSLATE", defaults.auto_translate),
            target_language: env::var("TARGET_LANGUAGE").unwrap_or(defaults.target_language),
        };
        config.clamp();
        config
    }

    /// Clamps numeric fields to their supported ranges.
    pub fn clamp(&mut self) {
        self.max_articles = self.max_articles.clamp(1, 100);
        self.tts_rate = self.tts_rate.clamp(50, 500);
        self.tts_volume = self.tts_volume.clamp(0.0, 1.0);
        self.openai_temperature = self.openai_temperature.clamp(0.0, 2.0);
    }
}

/// Loads `.env`-style files into the process environment.
///
/// Variables already present in the environment win over file values. A
/// missing default `.env` is not an error; an explicitly named file that
/// cannot be read is.
pub fn load_env_file(path: Option<&Path>) -> Result<(), String> {
    match path {
        Some(file) => match dotenvy::from_path(file) {
            Ok(()) => Ok(()),
            Err(err) => Err(format!(
                "cannot load config file {}: {err}",
                file.display()
            )),
        },
        None => {
            let _ = dotenvy::dotenv();
            Ok(())
        }
    }
}

/// Platform default speech program: `say` on macOS, `espeak` elsewhere.
pub fn default_tts_engine() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

fn env_parsed<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(name) {
        Ok(raw) => parse_or_default(name, raw.as_str(), default),
        Err(_) => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => parse_bool_or_default(name, raw.as_str(), default),
        Err(_) => default,
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses one numeric setting, keeping `default` on bad input.
fn parse_or_default<T>(name: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                "event=config_parse module=config status=invalid key={name} value=`{raw}` default={default}"
            );
            default
        }
    }
}

/// Parses one boolean setting, accepting `true`/`false` case-insensitively.
fn parse_bool_or_default(name: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            warn!(
                "event=config_parse module=config status=invalid key={name} value=`{raw}` default={default}"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.database_path, PathBuf::from("data/articles.db"));
        assert_eq!(config.max_articles, 3);
        assert_eq!(config.max_summary_length, 500);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.tts_rate, 180);
        assert_eq!(config.rate_limit_secs, 2);
        assert_eq!(config.target_language, "ja");
        assert!(config.auto_mark_read);
        assert!(config.speech_enabled);
        assert!(config.auto_translate);
    }

    #[test]
    fn parse_accepts_valid_numbers() {
        assert_eq!(parse_or_default("K", "42", 3u32), 42);
        assert_eq!(parse_or_default("K", " 0.5 ", 0.3f32), 0.5);
    }

    #[test]
    fn parse_keeps_default_on_garbage() {
        assert_eq!(parse_or_default("K", "many", 3u32), 3);
        assert_eq!(parse_or_default("K", "", 30u64), 30);
    }

    #[test]
    fn parse_bool_accepts_true_false_case_insensitively() {
        assert!(parse_bool_or_default("K", "true", false));
        assert!(parse_bool_or_default("K", "TRUE", false));
        assert!(!parse_bool_or_default("K", "false", true));
        assert!(parse_bool_or_default("K", "yes", true));
        assert!(!parse_bool_or_default("K", "1", false));
    }

    #[test]
    fn clamp_enforces_ranges() {
        let mut config = AppConfig {
            max_articles: 0,
            tts_rate: 10,
            tts_volume: 1.5,
            openai_temperature: 5.0,
            ..AppConfig::default()
        };
        config.clamp();
        assert_eq!(config.max_articles, 1);
        assert_eq!(config.tts_rate, 50);
        assert_eq!(config.tts_volume, 1.0);
        assert_eq!(config.openai_temperature, 2.0);

        config.max_articles = 1000;
        config.tts_rate = 9999;
        config.tts_volume = -0.2;
        config.clamp();
        assert_eq!(config.max_articles, 100);
        assert_eq!(config.tts_rate, 500);
        assert_eq!(config.tts_volume, 0.0);
    }

    #[test]
    fn default_engine_is_a_known_program() {
        let engine = default_tts_engine();
        assert!(engine == "say" || engine == "espeak");
    }
}
