//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate storage, enrichment and narration into session-level APIs.
//! - Keep the CLI layer decoupled from storage and transport details.

pub mod session;

pub use session::{format_narration_text, SessionOptions, SessionReport, SessionService};
