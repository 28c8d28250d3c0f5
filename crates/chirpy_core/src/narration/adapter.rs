//! Blocking speech adapter with a command-line fallback chain.
//!
//! # Responsibility
//! - Render engine-specific arguments for the configured speech program.
//! - Run the primary engine and fall back to the bare platform utility.
//!
//! # Invariants
//! - Engine availability is resolved once at construction, never per call.
//! - `speak` always returns an outcome value; narration failures never
//!   propagate as errors or panics.

use crate::config::{default_tts_engine, AppConfig};
use log::{debug, error, info, warn};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Outcome of one narration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationOutcome {
    /// Primary engine spoke the text to completion.
    Spoken,
    /// Primary engine was unavailable or failed; the platform utility spoke.
    SpokenViaFallback,
    /// Text was empty or whitespace-only; nothing was attempted.
    NothingToSpeak,
    /// Speech is disabled by configuration.
    Disabled,
    /// Both primary and fallback paths failed.
    Failed,
}

impl NarrationOutcome {
    /// True only when text was available but nothing was spoken.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Speech operations used by session workflows.
pub trait Narrator {
    /// Speaks `text` to completion, returning what actually happened.
    fn speak(&self, text: &str) -> NarrationOutcome;
}

/// One resolved speech invocation: program plus rendered arguments.
///
/// The narrated text is appended as the final argument when run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl SpeechCommand {
    /// Builds a command from a program and pre-rendered arguments.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Runs the program to completion with `text` appended.
    fn run(&self, text: &str) -> Result<(), String> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output();
        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr_snippet(&output.stderr)
            )),
            Err(err) => Err(format!(
                "{} failed to start: {err}",
                self.program.display()
            )),
        }
    }
}

/// Primary speech capability, decided once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEngine {
    /// Configured engine found on `PATH`, with rendered arguments.
    Primary(SpeechCommand),
    /// Configured engine not found; only the fallback utility remains.
    Unavailable,
}

/// Command-line speech adapter with a platform fallback.
#[derive(Debug)]
pub struct NarrationAdapter {
    engine: NarrationEngine,
    fallback: SpeechCommand,
    enabled: bool,
}

impl NarrationAdapter {
    /// Resolves the configured engine on `PATH` and builds the adapter.
    pub fn new(config: &AppConfig) -> Self {
        let engine = resolve_engine(config);
        match &engine {
            NarrationEngine::Primary(command) => {
                info!(
                    "event=narration_init module=narration status=ok engine={}",
                    command.program.display()
                );
            }
            NarrationEngine::Unavailable => {
                warn!(
                    "event=narration_init module=narration status=degraded engine={} reason=not_on_path",
                    config.tts_engine
                );
            }
        }
        Self {
            engine,
            fallback: SpeechCommand::new(default_tts_engine(), Vec::new()),
            enabled: config.speech_enabled,
        }
    }

    /// Builds an adapter from explicit parts.
    pub fn from_parts(engine: NarrationEngine, fallback: SpeechCommand, enabled: bool) -> Self {
        Self {
            engine,
            fallback,
            enabled,
        }
    }
}

impl Narrator for NarrationAdapter {
    fn speak(&self, text: &str) -> NarrationOutcome {
        if text.trim().is_empty() {
            return NarrationOutcome::NothingToSpeak;
        }
        if !self.enabled {
            debug!("event=narration module=narration status=disabled");
            return NarrationOutcome::Disabled;
        }

        if let NarrationEngine::Primary(command) = &self.engine {
            match command.run(text) {
                Ok(()) => return NarrationOutcome::Spoken,
                Err(details) => {
                    warn!("event=narration module=narration status=primary_failed details={details}");
                }
            }
        }

        match self.fallback.run(text) {
            Ok(()) => NarrationOutcome::SpokenViaFallback,
            Err(details) => {
                error!("event=narration module=narration status=failed details={details}");
                NarrationOutcome::Failed
            }
        }
    }
}

/// Renders engine arguments and resolves the program on `PATH`.
fn resolve_engine(config: &AppConfig) -> NarrationEngine {
    match find_on_path(&config.tts_engine) {
        Some(program) => NarrationEngine::Primary(SpeechCommand::new(program, engine_args(config))),
        None => NarrationEngine::Unavailable,
    }
}

/// Renders per-engine flags from speech settings.
///
/// `say` takes words-per-minute via `-r` and ignores volume; `espeak` takes
/// `-s` for rate and `-a` for amplitude on a 0-200 scale. Unknown engines get
/// the text only.
fn engine_args(config: &AppConfig) -> Vec<String> {
    let name = Path::new(&config.tts_engine)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(config.tts_engine.as_str());
    match name {
        "say" => {
            let mut args = vec!["-r".to_string(), config.tts_rate.to_string()];
            if let Some(voice) = &config.tts_voice {
                args.push("-v".to_string());
                args.push(voice.clone());
            }
            args
        }
        "espeak" | "espeak-ng" => {
            let amplitude = (config.tts_volume * 200.0).round() as u32;
            let mut args = vec![
                "-s".to_string(),
                config.tts_rate.to_string(),
                "-a".to_string(),
                amplitude.to_string(),
            ];
            if let Some(voice) = &config.tts_voice {
                args.push("-v".to_string());
                args.push(voice.clone());
            }
            args
        }
        _ => Vec::new(),
    }
}

/// Locates `program` on `PATH`; absolute and relative paths are checked as-is.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

// Keeps log lines single-line and short.
fn stderr_snippet(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut snippet: String = joined.chars().take(120).collect();
    if joined.chars().count() > 120 {
        snippet.push_str("...");
    }
    snippet
}
