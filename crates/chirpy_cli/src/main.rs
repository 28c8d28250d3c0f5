//! Command-line entry point for Chirpy.
//!
//! # Responsibility
//! - Resolve configuration in a fixed order: optional `.env` file, process
//!   environment, then command-line overrides, then range clamping.
//! - Initialize logging before anything touches the database or the network.
//! - Dispatch exactly one run mode: the default reading session, `--stats`,
//!   `--process-summaries`, `--translate-articles`, or `--show-config`.
//!
//! # Invariants
//! - A session that ran to completion exits 0 even when individual articles
//!   failed; non-zero exits are reserved for startup faults and storage errors.
//! - `--verbose` outranks `--quiet`, which outranks `--log-level`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use chirpy_core::{
    init_logging, load_env_file, open_db, AppConfig, ArticleStore, NarrationAdapter,
    OpenAiEnrichment, SessionOptions, SessionService, SqliteArticleStore,
};

/// Read unread RSS articles aloud, enriched through the OpenAI API.
#[derive(Parser, Debug)]
#[command(name = "chirpy", version, about)]
struct Args {
    /// Path to the articles database (overrides CHIRPY_DATABASE_PATH).
    database: Option<PathBuf>,

    /// Maximum number of articles to handle in one run.
    #[arg(long, value_name = "N")]
    max_articles: Option<u32>,

    /// Print database statistics and exit.
    #[arg(long, group = "mode")]
    stats: bool,

    /// Fetch and summarize articles with empty summaries, then exit.
    #[arg(long, group = "mode")]
    process_summaries: bool,

    /// Translate pending articles into the target language, then exit.
    #[arg(long, group = "mode")]
    translate_articles: bool,

    /// Print the resolved configuration and exit.
    #[arg(long)]
    show_config: bool,

    /// Disable speech output for this run.
    #[arg(long)]
    no_speech: bool,

    /// Text-to-speech engine, e.g. `say` or `espeak`.
    #[arg(long, value_name = "ENGINE")]
    tts_engine: Option<String>,

    /// Speech rate in words per minute.
    #[arg(long, value_name = "WPM")]
    tts_rate: Option<u32>,

    /// Speech volume between 0.0 and 1.0.
    #[arg(long, value_name = "LEVEL")]
    tts_volume: Option<f32>,

    /// Voice name passed through to the engine.
    #[arg(long, value_name = "VOICE")]
    tts_voice: Option<String>,

    /// Disable automatic translation for this run.
    #[arg(long)]
    no_translate: bool,

    /// Target language for translation (ISO 639-1 code).
    #[arg(long, value_name = "LANG")]
    target_language: Option<String>,

    /// Do not mark narrated articles as read.
    #[arg(long)]
    no_mark_read: bool,

    /// Do not pause between articles.
    #[arg(long)]
    no_pause: bool,

    /// Page fetch timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    fetch_timeout: Option<u64>,

    /// Delay between enrichment requests in seconds.
    #[arg(long, value_name = "SECONDS")]
    rate_limit: Option<u64>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Directory for rotated log files; stderr only when omitted.
    #[arg(long, value_name = "PATH")]
    log_dir: Option<String>,

    /// Shortcut for --log-level debug.
    #[arg(short, long)]
    verbose: bool,

    /// Shortcut for --log-level error.
    #[arg(short, long)]
    quiet: bool,

    /// Explicit .env file to load before reading the environment.
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            // The logger may not be up yet; mirror fatal errors to stderr.
            error!("event=cli_fatal module=cli status=error detail=`{message}`");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    load_env_file(args.config_file.as_deref())?;

    let mut config = AppConfig::from_env();
    apply_overrides(&mut config, &args);

    init_logging(&config.log_level, config.log_dir.as_deref())?;

    if args.show_config {
        print_config(&config);
        return Ok(());
    }

    if !config.database_path.exists() {
        return Err(format!(
            "database not found at {}; set CHIRPY_DATABASE_PATH or pass a path",
            config.database_path.display()
        ));
    }

    let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
    let store = SqliteArticleStore::new(&conn);

    if args.stats {
        return print_stats(&store);
    }

    let enrichment = OpenAiEnrichment::new(&config).map_err(|err| err.to_string())?;
    let narrator = NarrationAdapter::new(&config);
    let service = SessionService::new(store, enrichment, narrator, SessionOptions::from(&config));

    if args.process_summaries {
        let generated = service
            .process_empty_summaries(config.max_articles)
            .map_err(|err| err.to_string())?;
        println!("Summaries generated: {generated}");
        return Ok(());
    }

    if args.translate_articles {
        let translated = service
            .translate_pending(config.max_articles)
            .map_err(|err| err.to_string())?;
        println!("Articles translated: {translated}");
        return Ok(());
    }

    let report = service.run_session().map_err(|err| err.to_string())?;
    info!(
        "event=cli_done module=cli status=ok processed={} skipped={}",
        report.processed, report.skipped
    );
    println!(
        "Session complete: {} narrated, {} skipped",
        report.processed, report.skipped
    );
    Ok(())
}

/// Folds command-line flags into the environment-derived config.
///
/// Later stages win: flags override the environment, and the final
/// `clamp` keeps out-of-range values from reaching the services.
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(path) = &args.database {
        config.database_path = path.clone();
    }
    if let Some(n) = args.max_articles {
        config.max_articles = n;
    }
    if args.no_speech {
        config.speech_enabled = false;
    }
    if let Some(engine) = &args.tts_engine {
        config.tts_engine = engine.clone();
    }
    if let Some(rate) = args.tts_rate {
        config.tts_rate = rate;
    }
    if let Some(volume) = args.tts_volume {
        config.tts_volume = volume;
    }
    if let Some(voice) = &args.tts_voice {
        config.tts_voice = Some(voice.clone());
    }
    if args.no_translate {
        config.auto_translate = false;
    }
    if let Some(lang) = &args.target_language {
        config.target_language = lang.clone();
    }
    if args.no_mark_read {
        config.auto_mark_read = false;
    }
    if args.no_pause {
        config.pause_between_articles = false;
    }
    if let Some(secs) = args.fetch_timeout {
        config.fetch_timeout_secs = secs;
    }
    if let Some(secs) = args.rate_limit {
        config.rate_limit_secs = secs;
    }
    if args.verbose {
        config.log_level = "debug".to_string();
    } else if args.quiet {
        config.log_level = "error".to_string();
    } else if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config.clamp();
}

fn print_config(config: &AppConfig) {
    println!("Chirpy configuration");
    println!();
    println!("[database]");
    println!("database_path = {}", config.database_path.display());
    println!();
    println!("[articles]");
    println!("max_articles = {}", config.max_articles);
    println!("max_summary_length = {}", config.max_summary_length);
    println!();
    println!("[openai]");
    println!(
        "openai_api_key = {}",
        mask_api_key(config.openai_api_key.as_deref())
    );
    println!("openai_model = {}", config.openai_model);
    println!("openai_max_tokens = {}", config.openai_max_tokens);
    println!("openai_temperature = {}", config.openai_temperature);
    println!();
    println!("[tts]");
    println!("tts_engine = {}", config.tts_engine);
    println!(
        "tts_voice = {}",
        config.tts_voice.as_deref().unwrap_or("(engine default)")
    );
    println!("tts_rate = {}", config.tts_rate);
    println!("tts_volume = {}", config.tts_volume);
    println!("speech_enabled = {}", config.speech_enabled);
    println!();
    println!("[fetching]");
    println!("fetch_timeout_secs = {}", config.fetch_timeout_secs);
    println!("rate_limit_secs = {}", config.rate_limit_secs);
    println!();
    println!("[logging]");
    println!("log_level = {}", config.log_level);
    println!(
        "log_dir = {}",
        config.log_dir.as_deref().unwrap_or("(stderr only)")
    );
    println!();
    println!("[translation]");
    println!("auto_translate = {}", config.auto_translate);
    println!("target_language = {}", config.target_language);
    println!();
    println!("[behavior]");
    println!("auto_mark_read = {}", config.auto_mark_read);
    println!("pause_between_articles = {}", config.pause_between_articles);
}

fn print_stats(store: &SqliteArticleStore<'_>) -> Result<(), String> {
    let stats = store.stats().map_err(|err| err.to_string())?;

    println!("Chirpy database statistics");
    println!("  total articles:  {}", stats.total);
    println!("  read:            {}", stat_line(stats.read, stats.total));
    println!("  unread:          {}", stat_line(stats.unread, stats.total));
    println!(
        "  empty summaries: {}",
        stat_line(stats.empty_summaries, stats.total)
    );
    Ok(())
}

/// Renders a count with its share of `total`, or the bare count when the
/// database is empty.
fn stat_line(count: u64, total: u64) -> String {
    if total == 0 {
        return count.to_string();
    }
    format!("{count} ({:.1}%)", count as f64 / total as f64 * 100.0)
}

/// Keeps only a short prefix of the key so logs and terminals never see the
/// full secret.
fn mask_api_key(key: Option<&str>) -> String {
    match key {
        Some(value) if value.chars().count() > 8 => {
            let prefix: String = value.chars().take(8).collect();
            format!("{prefix}...")
        }
        Some(_) => "***".to_string(),
        None => "(not set)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_outranks_quiet_and_level() {
        let args = Args::parse_from(["chirpy", "--verbose", "--quiet", "--log-level", "warn"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.log_level, "debug");

        let args = Args::parse_from(["chirpy", "--quiet", "--log-level", "warn"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.log_level, "error");

        let args = Args::parse_from(["chirpy", "--log-level", "warn"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn overrides_apply_and_clamp() {
        let args = Args::parse_from([
            "chirpy",
            "db/articles.db",
            "--max-articles",
            "250",
            "--tts-rate",
            "10",
            "--no-speech",
            "--no-translate",
            "--no-mark-read",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.database_path, PathBuf::from("db/articles.db"));
        assert_eq!(config.max_articles, 100);
        assert_eq!(config.tts_rate, 50);
        assert!(!config.speech_enabled);
        assert!(!config.auto_translate);
        assert!(!config.auto_mark_read);
    }

    #[test]
    fn run_modes_are_mutually_exclusive() {
        let parsed = Args::try_parse_from(["chirpy", "--stats", "--process-summaries"]);
        assert!(parsed.is_err());

        let parsed = Args::try_parse_from(["chirpy", "--stats", "--translate-articles"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn mask_api_key_keeps_short_prefix_only() {
        assert_eq!(mask_api_key(Some("sk-proj-super-secret")), "sk-proj-...");
        assert_eq!(mask_api_key(Some("short")), "***");
        assert_eq!(mask_api_key(None), "(not set)");
    }

    #[test]
    fn stat_line_shows_percentage_when_total_known() {
        assert_eq!(stat_line(3, 12), "3 (25.0%)");
        assert_eq!(stat_line(0, 7), "0 (0.0%)");
        assert_eq!(stat_line(0, 0), "0");
    }
}
