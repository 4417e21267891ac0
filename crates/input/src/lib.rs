//! Input routing: host key events mapped to navigation actions.
//!
//! # Invariants
//! - The controller consumes actions, never raw key events.
//! - Toggle controls fire on the initial press only, never on key repeat.

pub mod action;
mod router;

pub use action::{Action, Direction};
pub use router::{Control, InputRouter, Key, KeyBindings, KeyState};
