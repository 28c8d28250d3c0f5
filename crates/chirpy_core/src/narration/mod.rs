//! Speech output over platform command-line programs.
//!
//! # Responsibility
//! - Resolve the configured speech engine once at startup.
//! - Speak narration text to completion with a platform fallback chain.

pub mod adapter;

pub use adapter::{NarrationAdapter, NarrationOutcome, Narrator};
