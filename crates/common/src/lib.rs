//! Shared types for the dustmap viewer: camera pose, viewport and the pure
//! rotation-matrix helpers used to orient the raymarching camera.
//!
//! # Invariants
//! - Everything in this crate is plain data or a pure function.

pub mod rotation;
mod types;

pub use types::{CameraPose, Viewport};
