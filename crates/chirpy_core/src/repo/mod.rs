//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the article store contract the session pipeline depends on.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - `count_read + count_unread == count_total` in every reachable state.
//! - Read-marking is idempotent and enforced by a UNIQUE constraint,
//!   never by a check-then-insert sequence.

pub mod article_repo;
