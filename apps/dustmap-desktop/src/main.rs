use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use dustmap_assets::{
    CheckerTileSource, DatasetVersion, FsTileSource, TextureAtlas, TextureAtlasLoader, TileSource,
    select_edge_length,
};
use dustmap_common::Viewport;
use dustmap_input::{Action, Key, KeyState};
use dustmap_kernel::{CameraMode, PresetPose, Session, ViewerConfig};
use dustmap_render::{RenderLoop, TickOutcome};
use dustmap_render_wgpu::{GpuContext, TileTexture, WgpuBackend};
use dustmap_tools::SessionInspector;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "dustmap-desktop", about = "Fly through the 3D dust map")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Viewer configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset version (b15 or b19), overrides the config
    #[arg(long)]
    ver: Option<DatasetVersion>,

    /// Directory containing media/, overrides the config
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Use generated checkerboard tiles instead of dataset files
    #[arg(long)]
    synthetic: bool,

    /// Orbit slowly instead of reading the keyboard
    #[arg(long)]
    idle_orbit: bool,

    #[arg(long, allow_negative_numbers = true)]
    x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    z: Option<f64>,
    /// Yaw in degrees
    #[arg(long, allow_negative_numbers = true)]
    alpha: Option<f64>,
    /// Pitch in degrees
    #[arg(long, allow_negative_numbers = true)]
    beta: Option<f64>,
    /// Viewer query string, e.g. "ver=b19&x=1&y=0&z=0&alpha=90&beta=0".
    /// Values may be URL-encoded; --ver takes precedence over `ver`.
    #[arg(long, conflicts_with = "x")]
    query: Option<String>,
}

/// How often the event loop wakes to collect finished tiles while loading.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(16);

enum Stage {
    /// Tiles are still arriving; the window stays responsive but draws nothing.
    Loading {
        loader: TextureAtlasLoader,
        atlas: TextureAtlas<TileTexture>,
    },
    Running {
        session: Session<TileTexture>,
        render_loop: RenderLoop,
    },
}

/// Everything that exists once the window and GPU are up.
struct Viewer {
    window: Arc<Window>,
    backend: WgpuBackend,
    stage: Stage,
    config: ViewerConfig,
    preset: Option<PresetPose>,
    started: Instant,
    last_fps_log_ms: f64,
}

impl Viewer {
    fn init(
        event_loop: &ActiveEventLoop,
        config: &ViewerConfig,
        preset: Option<PresetPose>,
        source: Arc<dyn TileSource>,
        started: Instant,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(format!("Bayestar dust map ({})", config.dataset))
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let size = window.inner_size();

        let gpu = GpuContext::new(window.clone(), Viewport::new(size.width, size.height))?;
        let edge = select_edge_length(gpu.max_texture_dimension());
        tracing::info!(edge, "choosing texture size {edge}x{edge}");

        let backend = WgpuBackend::new(gpu, &config.raymarch, &config.dataset.distance_grid());
        let atlas = TextureAtlas::new(config.dataset, edge);
        let loader = TextureAtlasLoader::spawn(source, &atlas)?;
        tracing::debug!(issued = loader.issued(), "waiting for tiles");

        Ok(Self {
            window,
            backend,
            stage: Stage::Loading { loader, atlas },
            config: config.clone(),
            preset,
            started,
            last_fps_log_ms: 0.0,
        })
    }

    /// Collect finished tiles. Once the atlas is full, build the session and
    /// either start animating or draw the replay frame. Returns true while
    /// tiles are still outstanding.
    fn poll_loading(&mut self, now: f64) -> Result<bool> {
        let Stage::Loading { loader, atlas } = &mut self.stage else {
            return Ok(false);
        };
        let timeout = self.config.tile_timeout();
        if loader
            .poll_ready(atlas, &mut self.backend, timeout)?
            .is_none()
        {
            return Ok(true);
        }
        let (version, edge) = (atlas.version(), atlas.edge_length());
        let atlas = std::mem::replace(atlas, TextureAtlas::new(version, edge));
        tracing::info!(elapsed = ?self.started.elapsed(), "initialization complete");

        let mut session = Session::new(&self.config, atlas, self.preset);
        let mut render_loop = RenderLoop::new();
        if session.mode() == CameraMode::Replay {
            render_loop.render_once(&mut session, &mut self.backend, now)?;
        } else {
            render_loop.start(&mut session, now)?;
            self.window.request_redraw();
        }
        self.last_fps_log_ms = now;
        self.stage = Stage::Running {
            session,
            render_loop,
        };
        Ok(false)
    }

    fn handle_key(&mut self, key: Key, state: KeyState, repeat: bool, now: f64) -> Result<()> {
        let Stage::Running { session, .. } = &mut self.stage else {
            return Ok(());
        };
        match session.handle_key(key, state, repeat) {
            Some(Action::TogglePause) => self.toggle_pause(now),
            _ => Ok(()),
        }
    }

    fn toggle_pause(&mut self, now: f64) -> Result<()> {
        let Stage::Running {
            session,
            render_loop,
        } = &mut self.stage
        else {
            return Ok(());
        };
        if session.mode() == CameraMode::Replay {
            return Ok(());
        }
        if render_loop.is_active() {
            render_loop.stop();
            tracing::info!("animation paused");
        } else {
            render_loop.start(session, now)?;
            self.window.request_redraw();
        }
        Ok(())
    }

    fn resize(&mut self, size: Viewport) {
        self.backend.set_window_size(size);
        if matches!(&self.stage, Stage::Running { session, .. } if session.mode() == CameraMode::Replay)
        {
            self.window.request_redraw();
        }
    }

    fn redraw(&mut self, now: f64) -> Result<()> {
        let Stage::Running {
            session,
            render_loop,
        } = &mut self.stage
        else {
            return Ok(());
        };

        // The replay frame was drawn once; later requests only repaint it.
        if session.mode() == CameraMode::Replay {
            render_loop.repaint(session, &mut self.backend)?;
            return Ok(());
        }

        let outcome = render_loop.tick(session, &mut self.backend, now)?;
        if outcome == TickOutcome::Continue {
            self.window.request_redraw();
        }

        if now - self.last_fps_log_ms >= 1000.0 {
            self.last_fps_log_ms = now;
            if session.fps().is_some() {
                tracing::debug!("{}", SessionInspector::summary(session));
            }
        }
        Ok(())
    }
}

struct App {
    config: ViewerConfig,
    preset: Option<PresetPose>,
    source: Arc<dyn TileSource>,
    started: Instant,
    viewer: Option<Viewer>,
}

impl App {
    fn new(config: ViewerConfig, preset: Option<PresetPose>, source: Arc<dyn TileSource>) -> Self {
        Self {
            config,
            preset,
            source,
            started: Instant::now(),
            viewer: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match Viewer::init(
            event_loop,
            &self.config,
            self.preset,
            Arc::clone(&self.source),
            self.started,
        ) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(e) => {
                tracing::error!("initialization failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = now_ms(self.started);
        let Some(viewer) = &mut self.viewer else {
            return;
        };
        match viewer.poll_loading(now) {
            Ok(true) => event_loop
                .set_control_flow(ControlFlow::WaitUntil(Instant::now() + LOAD_POLL_INTERVAL)),
            Ok(false) => event_loop.set_control_flow(ControlFlow::Wait),
            Err(e) => {
                tracing::error!("initialization failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let now = now_ms(self.started);
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(new_size) => {
                viewer.resize(Viewport::new(new_size.width, new_size.height));
                Ok(())
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(&logical_key) else {
                    return;
                };
                let state = match state {
                    ElementState::Pressed => KeyState::Pressed,
                    ElementState::Released => KeyState::Released,
                };
                viewer.handle_key(key, state, repeat, now)
            }
            WindowEvent::RedrawRequested => viewer.redraw(now),
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::error!("{e:#}");
            event_loop.exit();
        }
    }
}

fn now_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Map a winit logical key onto the viewer's key space. Letters are folded
/// to lowercase so bindings ignore shift.
fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Named(NamedKey::ArrowLeft) => Some(Key::Left),
        WinitKey::Named(NamedKey::ArrowRight) => Some(Key::Right),
        WinitKey::Named(NamedKey::ArrowUp) => Some(Key::Up),
        WinitKey::Named(NamedKey::ArrowDown) => Some(Key::Down),
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Character(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Some(Key::Char(c.to_ascii_lowercase())),
                _ => None,
            }
        }
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("dustmap-desktop starting");

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(query) = &cli.query {
        if let Err(err) = config.apply_query(query) {
            tracing::warn!(%err, "ignoring dataset from query");
        }
    }
    if let Some(ver) = cli.ver {
        config.dataset = ver;
    }
    if let Some(assets) = &cli.assets {
        config.asset_root = assets.clone();
    }
    if cli.idle_orbit {
        config.features.idle_orbit = true;
    }

    let parsed = match &cli.query {
        Some(query) => PresetPose::from_query(query),
        None => PresetPose::from_parts(cli.x, cli.y, cli.z, cli.alpha, cli.beta),
    };
    let preset = PresetPose::or_interactive(parsed);

    let source: Arc<dyn TileSource> = if cli.synthetic {
        Arc::new(CheckerTileSource::default())
    } else {
        Arc::new(FsTileSource::new(config.asset_root.clone()))
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, preset, source);
    event_loop.run_app(&mut app)?;

    Ok(())
}
