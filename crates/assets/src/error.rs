use std::path::PathBuf;

/// Errors from dataset selection, tile fetching and the readiness wait.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("unknown dataset version: {0:?}")]
    UnknownVersion(String),
    #[error("failed to read tile {}: {source}", path.display())]
    Fetch {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("tile {name} is {width}x{height}, expected {expected}x{expected}")]
    TileSize {
        name: String,
        expected: u32,
        width: u32,
        height: u32,
    },
    #[error("tile index {index} out of range for {count} slots")]
    IndexOutOfRange { index: u32, count: u32 },
    #[error("tile upload failed for index {index}: {reason}")]
    Upload { index: u32, reason: String },
    #[error("failed to spawn tile fetch worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("timed out waiting for tiles: {loaded} of {total} loaded")]
    Timeout { loaded: u32, total: u32 },
    #[error("tile workers exited with {loaded} of {total} tiles loaded")]
    Incomplete { loaded: u32, total: u32 },
}
