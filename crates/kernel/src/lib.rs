//! Viewing session kernel: frame clock, navigation intent, camera controller
//! and the session object that owns them together with the texture atlas.
//!
//! # Invariants
//! - One session owns the pose, the intent, the frame clock and the atlas.
//! - Pose changes only inside `CameraController::advance` or on homing entry.
//! - The first clock sample never advances the camera.

pub mod clock;
pub mod config;
pub mod controller;
pub mod intent;
pub mod preset;
pub mod session;

pub use clock::{FrameClock, FrameSample};
pub use config::{ConfigError, Features, RaymarchParams, ViewerConfig};
pub use controller::{CameraController, CameraMode, MotionTuning};
pub use intent::NavigationIntent;
pub use preset::PresetPose;
pub use session::Session;
