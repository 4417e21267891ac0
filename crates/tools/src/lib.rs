//! Developer tooling: read-only session and atlas inspection.
//!
//! # Invariants
//! - Inspectors never mutate the session.

mod inspector;

pub use inspector::{SessionInspector, SessionSummary, TileStatus};
