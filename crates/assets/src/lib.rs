//! Dataset tiles and the texture-atlas readiness gate.
//!
//! A dataset version names a fixed number of square raster tiles that
//! together form the equirectangular texture sampled by the raymarcher.
//! Tiles are fetched on worker threads, handed back to the owning thread
//! with their slot index, uploaded there and counted exactly once.
//!
//! # Invariants
//! - Tile count and edge length never change after the atlas is created.
//! - Readiness is a one-way latch: once every slot is loaded it stays loaded.
//! - Upload happens on the thread that owns the atlas, never on a worker.

mod atlas;
mod dataset;
mod error;
mod loader;
mod source;
mod tile;

pub use atlas::{TextureAtlas, TileSlot};
pub use dataset::{DatasetVersion, DistanceGrid};
pub use error::AtlasError;
pub use loader::{TextureAtlasLoader, TileUploader};
pub use source::{CheckerTileSource, FsTileSource, TileSource};
pub use tile::{EDGE_CANDIDATES, TileImage, TileKey, select_edge_length};
