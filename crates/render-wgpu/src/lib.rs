//! wgpu render backend for the dust-map viewer.
//!
//! Draws one screen-filling quad per frame with a raymarch fragment program
//! that samples the dataset tiles. Tiles are uploaded with a single mip level
//! and sampled with nearest filtering.
//!
//! # Invariants
//! - The backend never touches the camera; it only consumes uniforms.
//! - At most [`MAX_TILES`] tiles are bound; unused slots see a 1x1 placeholder.

mod backend;
mod gpu;
mod shaders;

pub use backend::{TileTexture, WgpuBackend};
pub use gpu::{GpuContext, MAX_TILES};
