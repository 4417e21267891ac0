use dustmap_common::{Viewport, rotation};
use dustmap_kernel::Session;
use serde::Serialize;

/// Everything the raymarch program receives per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderUniforms {
    /// Drawable size in pixels.
    pub viewport: [f32; 2],
    /// Milliseconds of animation, paused intervals excluded.
    pub elapsed_ms: f32,
    /// Camera rotation, rows of the row-major matrix as GPU columns.
    pub rotation: [[f32; 4]; 4],
    /// Camera position.
    pub origin: [f32; 3],
    /// `0..loaded_count`, one entry per bound tile.
    pub sampler_indices: Vec<u32>,
}

impl RenderUniforms {
    pub fn from_session<H>(session: &Session<H>, viewport: Viewport, elapsed_ms: f64) -> Self {
        Self {
            viewport: viewport.as_f32(),
            elapsed_ms: elapsed_ms as f32,
            rotation: rotation::to_gpu(&session.rotation()),
            origin: session.origin().as_vec3().to_array(),
            sampler_indices: session.atlas().sampler_indices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustmap_assets::{DatasetVersion, TextureAtlas};
    use dustmap_kernel::{PresetPose, ViewerConfig};

    #[test]
    fn uniforms_reflect_session() {
        let mut atlas = TextureAtlas::new(DatasetVersion::B15, 256);
        atlas.mark_loaded(0, ()).unwrap();
        atlas.mark_loaded(1, ()).unwrap();
        let preset = PresetPose::from_query("x=1&y=2&z=3&alpha=0&beta=0").unwrap();
        let session = Session::new(&ViewerConfig::default(), atlas, preset);

        let uniforms = RenderUniforms::from_session(&session, Viewport::new(800, 600), 42.0);
        assert_eq!(uniforms.viewport, [800.0, 600.0]);
        assert_eq!(uniforms.elapsed_ms, 42.0);
        assert_eq!(uniforms.origin, [1.0, 2.0, 3.0]);
        assert_eq!(uniforms.sampler_indices, vec![0, 1]);
        assert_eq!(
            uniforms.rotation,
            rotation::to_gpu(&rotation::base_orientation())
        );
    }

    #[test]
    fn uniforms_serialize_to_json() {
        let atlas: TextureAtlas<()> = TextureAtlas::new(DatasetVersion::B15, 256);
        let session = Session::new(&ViewerConfig::default(), atlas, None);
        let uniforms = RenderUniforms::from_session(&session, Viewport::new(2, 1), 0.0);
        let json = serde_json::to_value(&uniforms).unwrap();
        assert_eq!(json["viewport"][0], 2.0);
        assert!(json["sampler_indices"].as_array().unwrap().is_empty());
    }
}
