//! Rendering adapter: per-frame uniform assembly and the render loop.
//!
//! # Invariants
//! - The renderer never mutates the camera; it only reads the session.
//! - Nothing is drawn before the texture atlas is ready.
//! - Stopping is cooperative and takes effect at the top of the next tick.
//!
//! The [`RenderBackend`] trait is the seam between the loop and the GPU.
//! [`DebugTextRenderer`] is a headless backend for the CLI and for tests.

mod render_loop;
mod renderer;
mod uniforms;

pub use render_loop::{RenderLoop, StopHandle, TickOutcome};
pub use renderer::{DebugTextRenderer, RenderBackend, RenderError};
pub use uniforms::RenderUniforms;
