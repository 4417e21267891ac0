use std::path::{Path, PathBuf};

use dustmap_assets::{AtlasError, DatasetVersion};
use dustmap_input::KeyBindings;
use serde::{Deserialize, Serialize};

use crate::clock::FrameClock;
use crate::controller::MotionTuning;
use crate::preset::query_pairs;

/// Errors from loading or validating viewer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid preset pose: {0}")]
    InvalidPreset(String),
    #[error("invalid query string: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Dataset(#[from] AtlasError),
}

/// Optional viewer behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Accept a preset pose and render it once instead of flying.
    pub preset_pose: bool,
    pub homing: bool,
    /// Drive the camera along a slow procedural orbit instead of the keyboard.
    pub idle_orbit: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            preset_pose: true,
            homing: true,
            idle_orbit: false,
        }
    }
}

/// Parameters forwarded untouched to the raymarch program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaymarchParams {
    /// Field of view in degrees.
    pub fov: f64,
    /// Optical depth at which a ray is terminated.
    pub tau_max: f64,
    pub n_steps_max: u32,
    /// Step-size growth parameter.
    pub xi: f64,
    /// Samples per pixel.
    pub n_samples: u32,
    /// Colour scheme index.
    pub color: i32,
}

impl Default for RaymarchParams {
    fn default() -> Self {
        Self {
            fov: 90.0,
            tau_max: 5.0,
            n_steps_max: 150,
            xi: 25.0,
            n_samples: 1,
            color: 0,
        }
    }
}

impl RaymarchParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("raymarch.fov", self.fov, 0.0, 180.0)?;
        check_range("raymarch.tau_max", self.tau_max, 0.0, 100.0)?;
        check_range("raymarch.n_steps_max", f64::from(self.n_steps_max), 0.0, 10_000.0)?;
        check_range("raymarch.xi", self.xi, 0.0, 1000.0)?;
        check_range("raymarch.n_samples", f64::from(self.n_samples), 1.0, 100.0)?;
        Ok(())
    }
}

/// Everything a viewing session needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub dataset: DatasetVersion,
    /// Directory containing `media/`.
    pub asset_root: PathBuf,
    /// Upper bound on the wait for every tile to load.
    pub tile_timeout_secs: f64,
    /// Weight of the newest frame in the smoothed FPS.
    pub fps_ema_alpha: f64,
    pub motion: MotionTuning,
    pub features: Features,
    pub keys: KeyBindings,
    pub raymarch: RaymarchParams,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetVersion::default(),
            asset_root: PathBuf::from("."),
            tile_timeout_secs: 60.0,
            fps_ema_alpha: FrameClock::DEFAULT_ALPHA,
            motion: MotionTuning::default(),
            features: Features::default(),
            keys: KeyBindings::default(),
            raymarch: RaymarchParams::default(),
        }
    }
}

impl ViewerConfig {
    /// Load and validate a YAML config file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), dataset = %config.dataset, "loaded config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("tile_timeout_secs", self.tile_timeout_secs, 0.001, 3600.0)?;
        // Alpha 0 would freeze the estimate at the first sample.
        check_range("fps_ema_alpha", self.fps_ema_alpha, f64::EPSILON, 1.0)?;

        let m = &self.motion;
        check_range("motion.yaw_speed", m.yaw_speed, 0.0, f64::MAX)?;
        check_range("motion.pitch_speed", m.pitch_speed, 0.0, f64::MAX)?;
        check_range("motion.forward_speed", m.forward_speed, 0.0, f64::MAX)?;
        check_range("motion.homing_tau", m.homing_tau, f64::EPSILON, f64::MAX)?;
        check_range("motion.snap_epsilon", m.snap_epsilon, 0.0, 1.0)?;
        check_range("motion.orbit_period_ms", m.orbit_period_ms, f64::EPSILON, f64::MAX)?;
        check_range(
            "motion.orbit_pitch_period_ms",
            m.orbit_pitch_period_ms,
            f64::EPSILON,
            f64::MAX,
        )?;
        check_range(
            "motion.orbit_pitch_amplitude",
            m.orbit_pitch_amplitude,
            0.0,
            std::f64::consts::PI,
        )?;

        self.raymarch.validate()
    }

    /// Take the dataset from a viewer query string's `ver` key, if present.
    /// Pose keys are left to [`PresetPose::from_query`](crate::PresetPose::from_query).
    pub fn apply_query(&mut self, query: &str) -> Result<(), ConfigError> {
        for (key, value) in query_pairs(query)? {
            if key == "ver" {
                self.dataset = value.parse()?;
                tracing::debug!(dataset = %self.dataset, "dataset from query");
            }
        }
        Ok(())
    }

    pub fn tile_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.tile_timeout_secs)
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so it is rejected too.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
