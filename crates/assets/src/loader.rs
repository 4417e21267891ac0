use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::atlas::TextureAtlas;
use crate::error::AtlasError;
use crate::source::TileSource;
use crate::tile::TileImage;

/// Uploads a decoded tile to the GPU and returns its handle.
///
/// Implementations use nearest-neighbour filtering and a single mip level:
/// mip generation and linear filtering blur the seams between tiles of the
/// equirectangular projection.
pub trait TileUploader {
    type Handle;

    fn upload(&mut self, tile: &TileImage) -> Result<Self::Handle, AtlasError>;
}

/// Result of one worker fetch, tagged with the slot index it was issued for.
struct TileCompletion {
    index: u32,
    result: Result<TileImage, AtlasError>,
}

/// Issues one fetch per pending slot and applies completions to the atlas.
///
/// Completions may arrive in any order. Each is uploaded on the calling
/// thread and marks its slot loaded exactly once.
pub struct TextureAtlasLoader {
    receiver: Receiver<TileCompletion>,
    issued: u32,
    started: Instant,
}

impl TextureAtlasLoader {
    /// Spawn a fetch worker for every slot of `atlas` that is not yet loaded.
    pub fn spawn<H>(
        source: Arc<dyn TileSource>,
        atlas: &TextureAtlas<H>,
    ) -> Result<Self, AtlasError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let keys = atlas.pending_keys();
        tracing::info!(
            version = %atlas.version(),
            edge = atlas.edge_length(),
            tiles = keys.len(),
            "fetching tiles"
        );

        for key in &keys {
            let key = *key;
            let source = Arc::clone(&source);
            let sender = sender.clone();
            std::thread::Builder::new()
                .name(format!("tile-fetch-{}", key.index))
                .spawn(move || {
                    let result = source.fetch(&key);
                    // The loader may already have given up; nothing to report to.
                    let _ = sender.send(TileCompletion {
                        index: key.index,
                        result,
                    });
                })?;
        }

        Ok(Self {
            receiver,
            issued: keys.len() as u32,
            started: Instant::now(),
        })
    }

    /// Number of fetches issued at spawn time.
    pub fn issued(&self) -> u32 {
        self.issued
    }

    /// Apply every completion that has already arrived, without blocking.
    /// Returns the number of newly loaded tiles.
    pub fn drain<U: TileUploader>(
        &mut self,
        atlas: &mut TextureAtlas<U::Handle>,
        uploader: &mut U,
    ) -> Result<u32, AtlasError> {
        let mut newly_loaded = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => {
                    if self.apply(completion, atlas, uploader)? {
                        newly_loaded += 1;
                    }
                }
                Err(TryRecvError::Empty) => return Ok(newly_loaded),
                Err(TryRecvError::Disconnected) => {
                    if atlas.is_ready() {
                        return Ok(newly_loaded);
                    }
                    return Err(AtlasError::Incomplete {
                        loaded: atlas.loaded_count(),
                        total: atlas.tile_count(),
                    });
                }
            }
        }
    }

    /// Non-blocking readiness check for hosts that own an event loop.
    ///
    /// Applies whatever has arrived, then returns the total load time once
    /// every slot is loaded, `None` while tiles are outstanding, or
    /// [`AtlasError::Timeout`] once `timeout` has passed since spawn.
    pub fn poll_ready<U: TileUploader>(
        &mut self,
        atlas: &mut TextureAtlas<U::Handle>,
        uploader: &mut U,
        timeout: Duration,
    ) -> Result<Option<Duration>, AtlasError> {
        self.drain(atlas, uploader)?;
        if atlas.is_ready() {
            let elapsed = self.started.elapsed();
            tracing::info!(?elapsed, "finished loading all tiles");
            return Ok(Some(elapsed));
        }
        if self.started.elapsed() >= timeout {
            tracing::error!(
                loaded = atlas.loaded_count(),
                total = atlas.tile_count(),
                "gave up waiting for tiles"
            );
            return Err(AtlasError::Timeout {
                loaded: atlas.loaded_count(),
                total: atlas.tile_count(),
            });
        }
        Ok(None)
    }

    /// Block until every slot is loaded, or fail once `timeout` has elapsed.
    ///
    /// Wakes only when a completion arrives; there is no polling interval.
    pub fn wait_ready<U: TileUploader>(
        &mut self,
        atlas: &mut TextureAtlas<U::Handle>,
        uploader: &mut U,
        timeout: Duration,
    ) -> Result<Duration, AtlasError> {
        let deadline = Instant::now() + timeout;
        while !atlas.is_ready() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply(completion, atlas, uploader)?;
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::error!(
                        loaded = atlas.loaded_count(),
                        total = atlas.tile_count(),
                        "gave up waiting for tiles"
                    );
                    return Err(AtlasError::Timeout {
                        loaded: atlas.loaded_count(),
                        total: atlas.tile_count(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(AtlasError::Incomplete {
                        loaded: atlas.loaded_count(),
                        total: atlas.tile_count(),
                    });
                }
            }
        }

        let elapsed = self.started.elapsed();
        tracing::info!(?elapsed, "finished loading all tiles");
        Ok(elapsed)
    }

    fn apply<U: TileUploader>(
        &self,
        completion: TileCompletion,
        atlas: &mut TextureAtlas<U::Handle>,
        uploader: &mut U,
    ) -> Result<bool, AtlasError> {
        let tile = completion.result?;
        if atlas
            .slots()
            .get(completion.index as usize)
            .is_some_and(|slot| slot.is_loaded())
        {
            tracing::warn!(index = completion.index, "tile already loaded, skipping upload");
            return Ok(false);
        }

        let handle = uploader.upload(&tile)?;
        let stored = atlas.mark_loaded(completion.index, handle)?;
        if stored {
            tracing::info!(
                "loaded tile {} ({} of {})",
                completion.index,
                atlas.loaded_count(),
                atlas.tile_count()
            );
        }
        Ok(stored)
    }
}
