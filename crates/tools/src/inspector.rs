use dustmap_assets::{DatasetVersion, TextureAtlas, TileKey};
use dustmap_kernel::Session;
use serde::Serialize;

/// Session inspector for developer tooling.
///
/// Provides read-only queries against a session for logging, the CLI and
/// debugging.
pub struct SessionInspector;

impl SessionInspector {
    /// Produce a summary of the session state.
    pub fn summary<H>(session: &Session<H>) -> SessionSummary {
        let pose = session.pose();
        let atlas = session.atlas();
        SessionSummary {
            mode: format!("{:?}", session.mode()),
            position: pose.position.to_array(),
            yaw_deg: pose.yaw.to_degrees(),
            pitch_deg: pose.pitch.to_degrees(),
            distance: pose.distance(),
            fps: session.fps(),
            frames: session.frames(),
            dataset: atlas.version(),
            tiles_loaded: atlas.loaded_count(),
            tile_count: atlas.tile_count(),
        }
    }

    /// Load state of every tile slot, in slot order.
    pub fn tiles<H>(atlas: &TextureAtlas<H>) -> Vec<TileStatus> {
        atlas
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| TileStatus {
                name: TileKey::new(atlas.version(), atlas.edge_length(), i as u32).file_name(),
                loaded: slot.is_loaded(),
            })
            .collect()
    }
}

/// Summary of session state for the inspector.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub mode: String,
    pub position: [f64; 3],
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub distance: f64,
    pub fps: Option<f64>,
    pub frames: u64,
    pub dataset: DatasetVersion,
    pub tiles_loaded: u32,
    pub tile_count: u32,
}

impl SessionSummary {
    pub fn atlas_ready(&self) -> bool {
        self.tiles_loaded == self.tile_count
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.position;
        write!(
            f,
            "Session: mode={} pos=({x:.3}, {y:.3}, {z:.3}) yaw={:.2}° pitch={:.2}° tiles={}/{} ({})",
            self.mode, self.yaw_deg, self.pitch_deg, self.tiles_loaded, self.tile_count, self.dataset
        )?;
        if let Some(fps) = self.fps {
            write!(f, " fps={fps:.1}")?;
        }
        Ok(())
    }
}

/// One tile slot as reported by the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileStatus {
    pub name: String,
    pub loaded: bool,
}

impl std::fmt::Display for TileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.loaded { "loaded" } else { "pending" };
        write!(f, "{} [{mark}]", self.name)
    }
}
