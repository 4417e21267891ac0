use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dustmap_common::Viewport;
use dustmap_kernel::Session;

use crate::renderer::{RenderBackend, RenderError};
use crate::uniforms::RenderUniforms;

/// Whether the host should schedule another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stopped,
}

/// Cloneable handle that asks a [`RenderLoop`] to stop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Takes effect at the top of the next tick; a tick already running
    /// completes its draw.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-frame orchestration: viewport check, clock tick, pose integration,
/// uniform assembly and one draw.
///
/// The host calls [`tick`](Self::tick) from its per-refresh callback and
/// schedules the next one only while it returns [`TickOutcome::Continue`].
#[derive(Debug, Default)]
pub struct RenderLoop {
    active: Arc<AtomicBool>,
    start_ms: f64,
    /// Elapsed time of the last drawn frame.
    elapsed_ms: f64,
    viewport: Option<Viewport>,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.active))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Begin (or resume) animation at `now_ms`.
    ///
    /// Refuses to start until every tile is loaded. Elapsed time picks up
    /// where the last drawn frame left it, and the clock baseline is dropped,
    /// so neither the pose nor the idle orbit integrates the paused interval.
    pub fn start<H>(&mut self, session: &mut Session<H>, now_ms: f64) -> Result<(), RenderError> {
        ensure_ready(session)?;
        session.reset_clock();
        self.start_ms = now_ms - self.elapsed_ms;
        self.active.store(true, Ordering::Release);
        tracing::info!("animation started");
        Ok(())
    }

    /// Run one tick at `now_ms`.
    pub fn tick<B: RenderBackend>(
        &mut self,
        session: &mut Session<B::Handle>,
        backend: &mut B,
        now_ms: f64,
    ) -> Result<TickOutcome, RenderError> {
        if !self.is_active() {
            return Ok(TickOutcome::Stopped);
        }
        let _span = tracing::trace_span!("frame", frame = session.frames()).entered();

        self.frame(session, backend, now_ms)?;

        Ok(if self.is_active() {
            TickOutcome::Continue
        } else {
            TickOutcome::Stopped
        })
    }

    /// Draw exactly one frame and leave the loop stopped. Used for replay
    /// of a fixed pose.
    pub fn render_once<B: RenderBackend>(
        &mut self,
        session: &mut Session<B::Handle>,
        backend: &mut B,
        now_ms: f64,
    ) -> Result<RenderUniforms, RenderError> {
        ensure_ready(session)?;
        self.active.store(false, Ordering::Release);
        self.start_ms = now_ms;
        tracing::info!(mode = ?session.mode(), "rendering single frame");
        self.frame(session, backend, now_ms)
    }

    /// Draw the current pose again without ticking the clock or advancing
    /// the session. Used when the window needs repainting while the loop is
    /// stopped, e.g. after a resize in replay.
    pub fn repaint<B: RenderBackend>(
        &mut self,
        session: &Session<B::Handle>,
        backend: &mut B,
    ) -> Result<RenderUniforms, RenderError> {
        ensure_ready(session)?;
        let viewport = self.sync_viewport(backend)?;
        let uniforms = RenderUniforms::from_session(session, viewport, self.elapsed_ms);
        backend.draw(&uniforms, &session.atlas().loaded_handles())?;
        Ok(uniforms)
    }

    fn frame<B: RenderBackend>(
        &mut self,
        session: &mut Session<B::Handle>,
        backend: &mut B,
        now_ms: f64,
    ) -> Result<RenderUniforms, RenderError> {
        let viewport = self.sync_viewport(backend)?;

        let elapsed_ms = now_ms - self.start_ms;
        self.elapsed_ms = elapsed_ms;
        session.advance(now_ms, elapsed_ms);

        let uniforms = RenderUniforms::from_session(session, viewport, elapsed_ms);
        let tiles = session.atlas().loaded_handles();
        backend.draw(&uniforms, &tiles)?;
        Ok(uniforms)
    }

    fn sync_viewport<B: RenderBackend>(&mut self, backend: &mut B) -> Result<Viewport, RenderError> {
        let viewport = backend.viewport();
        if self.viewport != Some(viewport) {
            tracing::debug!(width = viewport.width, height = viewport.height, "viewport changed");
            backend.configure_viewport(viewport)?;
            self.viewport = Some(viewport);
        }
        Ok(viewport)
    }
}

fn ensure_ready<H>(session: &Session<H>) -> Result<(), RenderError> {
    let atlas = session.atlas();
    if atlas.is_ready() {
        Ok(())
    } else {
        Err(RenderError::AtlasNotReady {
            loaded: atlas.loaded_count(),
            total: atlas.tile_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::DebugTextRenderer;
    use dustmap_assets::{DatasetVersion, TextureAtlas, TileKey};
    use dustmap_input::{Key, KeyState};
    use dustmap_kernel::{CameraMode, PresetPose, ViewerConfig};

    fn ready_atlas() -> TextureAtlas<TileKey> {
        let mut atlas = TextureAtlas::new(DatasetVersion::B15, 256);
        for key in atlas.pending_keys() {
            atlas.mark_loaded(key.index, key).unwrap();
        }
        atlas
    }

    fn session(preset: Option<PresetPose>) -> Session<TileKey> {
        Session::new(&ViewerConfig::default(), ready_atlas(), preset)
    }

    #[test]
    fn start_requires_ready_atlas() {
        let atlas = TextureAtlas::new(DatasetVersion::B15, 256);
        let mut session: Session<TileKey> = Session::new(&ViewerConfig::default(), atlas, None);
        let mut render_loop = RenderLoop::new();
        let err = render_loop.start(&mut session, 0.0).unwrap_err();
        assert!(matches!(err, RenderError::AtlasNotReady { loaded: 0, total: 4 }));
        assert!(!render_loop.is_active());
    }

    #[test]
    fn inactive_loop_draws_nothing() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();
        let outcome = render_loop.tick(&mut session, &mut backend, 0.0).unwrap();
        assert_eq!(outcome, TickOutcome::Stopped);
        assert!(backend.frames().is_empty());
    }

    #[test]
    fn each_tick_draws_once_with_all_tiles() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(320, 200));
        let mut render_loop = RenderLoop::new();
        render_loop.start(&mut session, 1000.0).unwrap();

        for t in [1000.0, 1016.0, 1033.0] {
            let outcome = render_loop.tick(&mut session, &mut backend, t).unwrap();
            assert_eq!(outcome, TickOutcome::Continue);
        }
        assert_eq!(backend.frames().len(), 3);
        let last = backend.last_uniforms().unwrap();
        assert_eq!(last.elapsed_ms, 33.0);
        assert_eq!(last.sampler_indices, vec![0, 1, 2, 3]);
        assert!(backend.frames()[2].contains("(4 tiles)"));
        assert_eq!(backend.configured(), Some(Viewport::new(320, 200)));
    }

    #[test]
    fn resize_reconfigures_backend() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(320, 200));
        let mut render_loop = RenderLoop::new();
        render_loop.start(&mut session, 0.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 0.0).unwrap();
        backend.resize(Viewport::new(640, 400));
        render_loop.tick(&mut session, &mut backend, 16.0).unwrap();
        assert_eq!(backend.configured(), Some(Viewport::new(640, 400)));
        assert_eq!(backend.last_uniforms().unwrap().viewport, [640.0, 400.0]);
    }

    #[test]
    fn stop_takes_effect_on_next_tick() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();
        render_loop.start(&mut session, 0.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 0.0).unwrap();

        let handle = render_loop.stop_handle();
        handle.stop();
        let outcome = render_loop.tick(&mut session, &mut backend, 16.0).unwrap();
        assert_eq!(outcome, TickOutcome::Stopped);
        assert_eq!(backend.frames().len(), 1);
    }

    #[test]
    fn pose_follows_input_between_ticks() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();
        render_loop.start(&mut session, 0.0).unwrap();

        session.handle_key(Key::Right, KeyState::Pressed, false);
        render_loop.tick(&mut session, &mut backend, 0.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 500.0).unwrap();
        assert!((session.pose().yaw - 0.6283).abs() < 1e-4);
    }

    #[test]
    fn resume_does_not_integrate_pause() {
        let mut session = session(None);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();
        render_loop.start(&mut session, 0.0).unwrap();
        session.handle_key(Key::Up, KeyState::Pressed, false);
        render_loop.tick(&mut session, &mut backend, 0.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 100.0).unwrap();
        let pitch = session.pose().pitch;

        render_loop.stop();
        render_loop.start(&mut session, 50_000.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 50_000.0).unwrap();
        assert_eq!(session.pose().pitch, pitch);
        assert_eq!(backend.last_uniforms().unwrap().elapsed_ms, 100.0);
    }

    #[test]
    fn idle_orbit_continues_after_resume() {
        let mut config = ViewerConfig::default();
        config.features.idle_orbit = true;
        let mut session = Session::new(&config, ready_atlas(), None);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();

        render_loop.start(&mut session, 1_000.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 1_000.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 4_750.0).unwrap();
        let yaw = session.pose().yaw;
        assert!((yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        render_loop.stop();
        render_loop.start(&mut session, 90_000.0).unwrap();
        render_loop.tick(&mut session, &mut backend, 90_000.0).unwrap();
        assert_eq!(session.pose().yaw, yaw);
        render_loop.tick(&mut session, &mut backend, 93_750.0).unwrap();
        assert!((session.pose().yaw - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn repaint_redraws_without_ticking() {
        let preset = PresetPose::from_query("x=0.5&y=0&z=0&alpha=45&beta=10").unwrap();
        let mut session = session(preset);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();
        let first = render_loop
            .render_once(&mut session, &mut backend, 0.0)
            .unwrap();

        backend.resize(Viewport::new(8, 6));
        let again = render_loop.repaint(&session, &mut backend).unwrap();
        assert_eq!(session.frames(), 1);
        assert_eq!(session.fps(), None);
        assert_eq!(again.origin, first.origin);
        assert_eq!(again.rotation, first.rotation);
        assert_eq!(again.viewport, [8.0, 6.0]);
        assert_eq!(backend.frames().len(), 2);
        assert!(!render_loop.is_active());
    }

    #[test]
    fn replay_renders_exactly_one_frame() {
        let preset = PresetPose::from_query("x=0.5&y=0&z=0&alpha=45&beta=10").unwrap();
        let mut session = session(preset);
        assert_eq!(session.mode(), CameraMode::Replay);
        let mut backend = DebugTextRenderer::new(Viewport::new(4, 4));
        let mut render_loop = RenderLoop::new();

        let uniforms = render_loop
            .render_once(&mut session, &mut backend, 0.0)
            .unwrap();
        assert_eq!(uniforms.origin, [0.5, 0.0, 0.0]);
        assert!(!render_loop.is_active());
        assert_eq!(
            render_loop.tick(&mut session, &mut backend, 16.0).unwrap(),
            TickOutcome::Stopped
        );
        assert_eq!(backend.frames().len(), 1);
    }
}
