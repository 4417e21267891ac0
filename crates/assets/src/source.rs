use std::path::PathBuf;

use crate::error::AtlasError;
use crate::tile::{TileImage, TileKey};

/// Fetches and decodes one tile. Called from worker threads.
pub trait TileSource: Send + Sync {
    fn fetch(&self, key: &TileKey) -> Result<TileImage, AtlasError>;
}

/// Reads PNG tiles from `<root>/media/<file_name>`.
#[derive(Debug, Clone)]
pub struct FsTileSource {
    root: PathBuf,
}

impl FsTileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &TileKey) -> PathBuf {
        self.root.join("media").join(key.file_name())
    }
}

impl TileSource for FsTileSource {
    fn fetch(&self, key: &TileKey) -> Result<TileImage, AtlasError> {
        let path = self.path_for(key);
        let decoded = image::open(&path).map_err(|source| AtlasError::Fetch {
            path: path.clone(),
            source,
        })?;

        if decoded.width() != key.edge || decoded.height() != key.edge {
            return Err(AtlasError::TileSize {
                name: key.file_name(),
                expected: key.edge,
                width: decoded.width(),
                height: decoded.height(),
            });
        }

        tracing::debug!(path = %path.display(), "decoded tile");
        Ok(TileImage {
            key: *key,
            rgba: decoded.to_rgba8().into_raw(),
        })
    }
}

/// Procedural checkerboard tiles, for running without dataset files.
#[derive(Debug, Clone, Copy)]
pub struct CheckerTileSource {
    /// Checker squares along one tile edge.
    pub squares: u32,
}

impl Default for CheckerTileSource {
    fn default() -> Self {
        Self { squares: 16 }
    }
}

impl TileSource for CheckerTileSource {
    fn fetch(&self, key: &TileKey) -> Result<TileImage, AtlasError> {
        let edge = key.edge;
        let cell = (edge / self.squares.max(1)).max(1);
        // Tint each tile differently so tile seams are visible.
        let tint = (key.index.wrapping_mul(37) % 128) as u8;
        let mut rgba = Vec::with_capacity((edge * edge * 4) as usize);
        for y in 0..edge {
            for x in 0..edge {
                let lit = ((x / cell) + (y / cell)) % 2 == 0;
                let v: u8 = if lit { 200 } else { 40 };
                rgba.extend_from_slice(&[v, v.saturating_sub(tint), tint, 255]);
            }
        }
        Ok(TileImage { key: *key, rgba })
    }
}
