use crate::dataset::DatasetVersion;
use crate::error::AtlasError;
use crate::tile::TileKey;

/// One tile slot. The handle is written at most once.
#[derive(Debug, Clone)]
pub struct TileSlot<H> {
    handle: Option<H>,
}

impl<H> TileSlot<H> {
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }
}

/// Fixed-length array of tile slots for one dataset version and edge length.
///
/// `H` is whatever the GPU uploader hands back for a tile (a texture view in
/// the wgpu backend, a plain index in tests).
#[derive(Debug, Clone)]
pub struct TextureAtlas<H> {
    version: DatasetVersion,
    edge: u32,
    slots: Vec<TileSlot<H>>,
    loaded: u32,
}

impl<H> TextureAtlas<H> {
    pub fn new(version: DatasetVersion, edge: u32) -> Self {
        let slots = (0..version.tile_count())
            .map(|_| TileSlot { handle: None })
            .collect();
        Self {
            version,
            edge,
            slots,
            loaded: 0,
        }
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn edge_length(&self) -> u32 {
        self.edge
    }

    pub fn tile_count(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn loaded_count(&self) -> u32 {
        self.loaded
    }

    pub fn is_ready(&self) -> bool {
        self.loaded == self.tile_count()
    }

    pub fn slots(&self) -> &[TileSlot<H>] {
        &self.slots
    }

    /// Keys of slots still waiting for a tile.
    pub fn pending_keys(&self) -> Vec<TileKey> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_loaded())
            .map(|(i, _)| TileKey::new(self.version, self.edge, i as u32))
            .collect()
    }

    /// Store the handle for `index`.
    ///
    /// Returns `Ok(false)` and keeps the existing handle when the slot was
    /// already loaded, so a duplicate completion never double-counts.
    pub fn mark_loaded(&mut self, index: u32, handle: H) -> Result<bool, AtlasError> {
        let count = self.tile_count();
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(AtlasError::IndexOutOfRange { index, count })?;
        if slot.is_loaded() {
            tracing::warn!(index, "duplicate tile completion ignored");
            return Ok(false);
        }
        slot.handle = Some(handle);
        self.loaded += 1;
        Ok(true)
    }

    /// Handles of loaded slots, in slot order.
    pub fn loaded_handles(&self) -> Vec<&H> {
        self.slots.iter().filter_map(TileSlot::handle).collect()
    }

    /// Sampler indices handed to the shader: `0..loaded_count`.
    pub fn sampler_indices(&self) -> Vec<u32> {
        (0..self.loaded).collect()
    }
}
