use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use dustmap_assets::{
    CheckerTileSource, DatasetVersion, FsTileSource, TextureAtlas, TextureAtlasLoader, TileKey,
    TileSource, select_edge_length,
};
use dustmap_common::Viewport;
use dustmap_input::{Key, KeyState};
use dustmap_kernel::{PresetPose, Session, ViewerConfig};
use dustmap_render::{DebugTextRenderer, RenderLoop, TickOutcome};
use dustmap_tools::SessionInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dustmap-cli", about = "Headless tools for the dust-map viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Viewer configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Dataset version (b15 or b19), overrides the config
    #[arg(long)]
    ver: Option<DatasetVersion>,

    /// Largest texture edge the target device accepts
    #[arg(long, default_value_t = 2048)]
    max_texture: u32,
}

#[derive(Args)]
struct PresetArgs {
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

impl PresetArgs {
    fn parse(&self) -> Result<Option<PresetPose>, dustmap_kernel::ConfigError> {
        match &self.query {
            Some(query) => PresetPose::from_query(query),
            None => PresetPose::from_parts(self.x, self.y, self.z, self.alpha, self.beta),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the dataset table
    Info,
    /// List the tile names a dataset needs
    Tiles {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Load every tile from disk and report how long it took
    CheckAssets {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Directory containing media/
        #[arg(long)]
        assets: Option<PathBuf>,
    },
    /// Render a preset pose once through the debug backend
    Replay {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        preset: PresetArgs,
        /// Load tiles from this directory instead of generating them
        #[arg(long)]
        assets: Option<PathBuf>,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
        /// Print uniforms and summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fly the camera with a scripted key sequence and print the final pose
    Simulate {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Comma-separated `ms:key` events; `+key` presses, `-key` releases
        #[arg(long, default_value = "")]
        script: String,
        /// Total simulated time
        #[arg(long, default_value_t = 5000.0)]
        duration_ms: f64,
        /// Frame interval
        #[arg(long, default_value_t = 16.0)]
        frame_ms: f64,
        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Info => {
            println!("dustmap-cli v{}", env!("CARGO_PKG_VERSION"));
            for version in DatasetVersion::ALL {
                let grid = version.distance_grid();
                println!(
                    "{version}: {} tiles, dm {}..{} in {} bins",
                    version.tile_count(),
                    grid.dm_min,
                    grid.dm_max,
                    grid.bins
                );
            }
            let config = load_config(config_path, None)?;
            print!("{}", config.to_yaml()?);
        }
        Commands::Tiles { dataset } => {
            let config = load_config(config_path, dataset.ver)?;
            let edge = select_edge_length(dataset.max_texture);
            let atlas: TextureAtlas<()> = TextureAtlas::new(config.dataset, edge);
            println!("{} tiles at {edge}x{edge}:", atlas.tile_count());
            for key in atlas.pending_keys() {
                println!("  media/{}", key.file_name());
            }
        }
        Commands::CheckAssets { dataset, assets } => {
            let config = load_config(config_path, dataset.ver)?;
            let root = assets.unwrap_or_else(|| config.asset_root.clone());
            let source = Arc::new(FsTileSource::new(root));
            let (atlas, elapsed) = load_atlas(&config, dataset.max_texture, source)?;
            for tile in SessionInspector::tiles(&atlas) {
                println!("{tile}");
            }
            println!("all {} tiles loaded in {elapsed:?}", atlas.tile_count());
        }
        Commands::Replay {
            dataset,
            preset,
            assets,
            width,
            height,
            json,
        } => {
            let mut config = load_config(config_path, None)?;
            if let Some(query) = &preset.query {
                config.apply_query(query)?;
            }
            if let Some(ver) = dataset.ver {
                config.dataset = ver;
            }
            let Some(preset) = preset.parse()? else {
                bail!("replay needs a preset pose (--x .. --beta or --query)");
            };
            let source: Arc<dyn TileSource> = match assets {
                Some(root) => Arc::new(FsTileSource::new(root)),
                None => Arc::new(CheckerTileSource::default()),
            };
            let (atlas, _) = load_atlas(&config, dataset.max_texture, source)?;

            let mut session = Session::new(&config, atlas, Some(preset));
            let mut backend = DebugTextRenderer::new(Viewport::new(width, height));
            let mut render_loop = RenderLoop::new();
            let uniforms = render_loop.render_once(&mut session, &mut backend, 0.0)?;

            if json {
                let out = serde_json::json!({
                    "summary": SessionInspector::summary(&session),
                    "uniforms": uniforms,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for frame in backend.frames() {
                    print!("{frame}");
                }
                println!("{}", SessionInspector::summary(&session));
            }
        }
        Commands::Simulate {
            dataset,
            script,
            duration_ms,
            frame_ms,
            json,
        } => {
            if frame_ms <= 0.0 {
                bail!("--frame-ms must be positive");
            }
            let config = load_config(config_path, dataset.ver)?;
            let events = parse_script(&script)?;
            let (atlas, _) = load_atlas(
                &config,
                dataset.max_texture,
                Arc::new(CheckerTileSource::default()),
            )?;

            let mut session = Session::new(&config, atlas, None);
            let mut backend = DebugTextRenderer::new(Viewport::new(64, 64));
            simulate(&mut session, &mut backend, &events, duration_ms, frame_ms)?;

            let summary = SessionInspector::summary(&session);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
                println!("frames drawn: {}", backend.frames().len());
            }
        }
    }

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    ver: Option<DatasetVersion>,
) -> anyhow::Result<ViewerConfig> {
    let mut config = match path {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(ver) = ver {
        config.dataset = ver;
    }
    Ok(config)
}

/// Fetch every tile through `source` and wait for the atlas to fill.
fn load_atlas(
    config: &ViewerConfig,
    max_texture: u32,
    source: Arc<dyn TileSource>,
) -> anyhow::Result<(TextureAtlas<TileKey>, Duration)> {
    let started = Instant::now();
    let edge = select_edge_length(max_texture);
    let mut atlas = TextureAtlas::new(config.dataset, edge);
    let mut uploader = DebugTextRenderer::default();
    let mut loader = TextureAtlasLoader::spawn(source, &atlas)?;
    loader.wait_ready(&mut atlas, &mut uploader, config.tile_timeout())?;
    let elapsed = started.elapsed();
    tracing::info!(?elapsed, "initialization complete");
    Ok((atlas, elapsed))
}

/// One scripted key event.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScriptEvent {
    at_ms: f64,
    key: Key,
    state: KeyState,
}

/// Parse `500:+right,1500:-right,2000:h`. A key without a sign is a press.
fn parse_script(script: &str) -> anyhow::Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();
    for item in script.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (at, key) = item
            .split_once(':')
            .with_context(|| format!("script event {item:?} is not `ms:key`"))?;
        let at_ms: f64 = at
            .trim()
            .parse()
            .with_context(|| format!("bad time in script event {item:?}"))?;
        let key = key.trim();
        let (state, name) = if let Some(name) = key.strip_prefix('+') {
            (KeyState::Pressed, name)
        } else if let Some(name) = key.strip_prefix('-') {
            (KeyState::Released, name)
        } else {
            (KeyState::Pressed, key)
        };
        let key: Key = name.parse()?;
        events.push(ScriptEvent { at_ms, key, state });
    }
    events.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
    Ok(events)
}

/// Drive the render loop at a fixed frame interval, feeding script events
/// as their time comes up.
fn simulate(
    session: &mut Session<TileKey>,
    backend: &mut DebugTextRenderer,
    events: &[ScriptEvent],
    duration_ms: f64,
    frame_ms: f64,
) -> anyhow::Result<()> {
    let mut render_loop = RenderLoop::new();
    render_loop.start(session, 0.0)?;
    let mut pending = events.iter().peekable();
    let mut now = 0.0;
    while now <= duration_ms {
        while let Some(event) = pending.next_if(|e| e.at_ms <= now) {
            if let Some(action) = session.handle_key(event.key, event.state, false) {
                tracing::debug!(?action, at_ms = event.at_ms, "unhandled scripted action");
            }
        }
        if render_loop.tick(session, backend, now)? == TickOutcome::Stopped {
            break;
        }
        now += frame_ms;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustmap_kernel::CameraMode;

    #[test]
    fn script_parses_and_sorts() {
        let events = parse_script("1500:-right, 500:+right,2000:h").unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].at_ms, 500.0);
        assert_eq!(events[0].key, Key::Right);
        assert_eq!(events[0].state, KeyState::Pressed);
        assert_eq!(events[1].state, KeyState::Released);
        assert_eq!(events[2].key, Key::Char('h'));
    }

    #[test]
    fn script_rejects_garbage() {
        assert!(parse_script("soon:right").is_err());
        assert!(parse_script("100").is_err());
        assert!(parse_script("100:wobble").is_err());
        assert!(parse_script("").unwrap().is_empty());
    }

    #[test]
    fn simulate_yaws_for_held_interval() {
        let config = ViewerConfig::default();
        let (atlas, _) = load_atlas(&config, 256, Arc::new(CheckerTileSource { squares: 2 })).unwrap();
        let mut session = Session::new(&config, atlas, None);
        let mut backend = DebugTextRenderer::new(Viewport::new(8, 8));
        let events = parse_script("0:+right,600:-right").unwrap();
        simulate(&mut session, &mut backend, &events, 1000.0, 100.0).unwrap();

        assert_eq!(session.mode(), CameraMode::FreeFlight);
        assert!((session.pose().yaw - 0.6283).abs() < 1e-4);
        assert_eq!(backend.frames().len(), 11);
    }

    #[test]
    fn load_config_applies_version_override() {
        let config = load_config(None, Some(DatasetVersion::B19)).unwrap();
        assert_eq!(config.dataset, DatasetVersion::B19);
    }
}
