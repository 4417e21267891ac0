use crate::dataset::DatasetVersion;

/// Tile edge lengths published for every dataset version, largest first.
pub const EDGE_CANDIDATES: [u32; 4] = [2048, 1024, 512, 256];

/// Largest published edge length the backend can hold, falling back to the
/// smallest candidate when even that exceeds `max_dimension`.
pub fn select_edge_length(max_dimension: u32) -> u32 {
    EDGE_CANDIDATES
        .iter()
        .copied()
        .find(|&edge| edge <= max_dimension)
        .unwrap_or(EDGE_CANDIDATES[EDGE_CANDIDATES.len() - 1])
}

/// Identifies one tile of one dataset version at one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub version: DatasetVersion,
    pub edge: u32,
    pub index: u32,
}

impl TileKey {
    pub fn new(version: DatasetVersion, edge: u32, index: u32) -> Self {
        Self {
            version,
            edge,
            index,
        }
    }

    /// Deterministic asset name, e.g. `texture_b15_1024x1024_3.png`.
    pub fn file_name(&self) -> String {
        format!(
            "texture_{}_{}x{}_{}.png",
            self.version.token(),
            self.edge,
            self.edge,
            self.index
        )
    }
}

/// A decoded tile: tightly packed RGBA8 rows, `edge * edge * 4` bytes.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub key: TileKey,
    pub rgba: Vec<u8>,
}

impl TileImage {
    pub fn edge(&self) -> u32 {
        self.key.edge
    }

    pub fn bytes_per_row(&self) -> u32 {
        4 * self.key.edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_selection_picks_largest_fitting() {
        assert_eq!(select_edge_length(16384), 2048);
        assert_eq!(select_edge_length(2048), 2048);
        assert_eq!(select_edge_length(1024), 1024);
        assert_eq!(select_edge_length(1500), 1024);
        assert_eq!(select_edge_length(256), 256);
    }

    #[test]
    fn edge_selection_falls_back_to_smallest() {
        assert_eq!(select_edge_length(200), 256);
        assert_eq!(select_edge_length(0), 256);
    }

    #[test]
    fn file_names_are_deterministic() {
        let key = TileKey::new(DatasetVersion::B15, 1024, 3);
        assert_eq!(key.file_name(), "texture_b15_1024x1024_3.png");
        let key = TileKey::new(DatasetVersion::B19, 256, 14);
        assert_eq!(key.file_name(), "texture_b19_256x256_14.png");
    }
}
