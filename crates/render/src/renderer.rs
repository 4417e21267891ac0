use std::fmt::Write as _;

use dustmap_assets::{AtlasError, TileImage, TileKey, TileUploader};
use dustmap_common::Viewport;

use crate::uniforms::RenderUniforms;

/// Errors from the render loop and its backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("texture atlas not ready: {loaded} of {total} tiles loaded")]
    AtlasNotReady { loaded: u32, total: u32 },
    #[error("no compatible graphics adapter")]
    NoAdapter,
    #[error("graphics device request failed: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("shader error: {0}")]
    Shader(String),
    #[error("{count} tiles bound, backend supports at most {max}")]
    TooManyTiles { count: usize, max: usize },
}

/// Renderer-agnostic draw interface. All backends implement this trait.
///
/// A backend owns the screen quad and the compiled raymarch program. The
/// loop hands it one set of uniforms and the loaded tile handles per frame.
pub trait RenderBackend {
    /// Handle of an uploaded tile texture.
    type Handle;

    /// Current drawable size.
    fn viewport(&self) -> Viewport;

    /// Resize internal targets to `viewport`.
    fn configure_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Bind the quad and submit one draw.
    fn draw(&mut self, uniforms: &RenderUniforms, tiles: &[&Self::Handle])
    -> Result<(), RenderError>;
}

/// Headless backend.
///
/// "Draws" a human-readable description of each frame's uniforms. Useful
/// for CLI output, logging, and testing the loop without a GPU.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    viewport: Viewport,
    configured: Option<Viewport>,
    frames: Vec<String>,
    last: Option<RenderUniforms>,
}

impl DebugTextRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Simulate a window resize.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Viewport last passed to `configure_viewport`.
    pub fn configured(&self) -> Option<Viewport> {
        self.configured
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn last_uniforms(&self) -> Option<&RenderUniforms> {
        self.last.as_ref()
    }

    pub fn describe(uniforms: &RenderUniforms, tiles: &[&TileKey]) -> String {
        let mut out = String::new();
        let [w, h] = uniforms.viewport;
        let [x, y, z] = uniforms.origin;
        let _ = writeln!(
            out,
            "=== Frame (t={:.1} ms, viewport={w}x{h}) ===",
            uniforms.elapsed_ms
        );
        let _ = writeln!(out, "Origin: ({x:.4}, {y:.4}, {z:.4})");
        let _ = writeln!(out, "Rotation:");
        for col in &uniforms.rotation {
            let _ = writeln!(
                out,
                "  [{:7.4} {:7.4} {:7.4} {:7.4}]",
                col[0], col[1], col[2], col[3]
            );
        }
        let _ = writeln!(
            out,
            "Samplers: {:?} ({} tiles)",
            uniforms.sampler_indices,
            tiles.len()
        );
        for key in tiles {
            let _ = writeln!(out, "  {}", key.file_name());
        }
        out
    }
}

impl RenderBackend for DebugTextRenderer {
    type Handle = TileKey;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn configure_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.configured = Some(viewport);
        Ok(())
    }

    fn draw(&mut self, uniforms: &RenderUniforms, tiles: &[&TileKey]) -> Result<(), RenderError> {
        self.frames.push(Self::describe(uniforms, tiles));
        self.last = Some(uniforms.clone());
        Ok(())
    }
}

/// Uploading to the debug backend only records which tile it was.
impl TileUploader for DebugTextRenderer {
    type Handle = TileKey;

    fn upload(&mut self, tile: &TileImage) -> Result<TileKey, AtlasError> {
        tracing::trace!(tile = %tile.key.file_name(), bytes = tile.rgba.len(), "debug upload");
        Ok(tile.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustmap_assets::DatasetVersion;

    fn uniforms() -> RenderUniforms {
        RenderUniforms {
            viewport: [640.0, 480.0],
            elapsed_ms: 12.5,
            rotation: [[0.0; 4]; 4],
            origin: [1.0, -2.0, 0.5],
            sampler_indices: vec![0, 1],
        }
    }

    #[test]
    fn describe_lists_uniforms_and_tiles() {
        let a = TileKey::new(DatasetVersion::B15, 256, 0);
        let b = TileKey::new(DatasetVersion::B15, 256, 1);
        let text = DebugTextRenderer::describe(&uniforms(), &[&a, &b]);
        assert!(text.contains("viewport=640x480"));
        assert!(text.contains("Origin: (1.0000, -2.0000, 0.5000)"));
        assert!(text.contains("Samplers: [0, 1] (2 tiles)"));
        assert!(text.contains("texture_b15_256x256_1.png"));
    }

    #[test]
    fn draw_records_frames() {
        let mut backend = DebugTextRenderer::new(Viewport::new(640, 480));
        backend.draw(&uniforms(), &[]).unwrap();
        backend.draw(&uniforms(), &[]).unwrap();
        assert_eq!(backend.frames().len(), 2);
        assert_eq!(backend.last_uniforms(), Some(&uniforms()));
    }

    #[test]
    fn upload_returns_tile_key() {
        let key = TileKey::new(DatasetVersion::B19, 512, 7);
        let mut backend = DebugTextRenderer::default();
        let tile = TileImage {
            key,
            rgba: vec![0; 512 * 512 * 4],
        };
        assert_eq!(backend.upload(&tile).unwrap(), key);
    }
}
