use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Camera pose: position plus yaw/pitch in radians.
///
/// Yaw is conceptually periodic in 2π and pitch in π, but neither is wrapped
/// except when the controller enters homing. Pitch is never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: DVec3,
    pub yaw: f64,
    pub pitch: f64,
}

impl CameraPose {
    /// The pose every session starts from when no preset is supplied.
    pub const ZERO: Self = Self {
        position: DVec3::ZERO,
        yaw: 0.0,
        pitch: 0.0,
    };

    pub fn new(position: DVec3, yaw: f64, pitch: f64) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    /// Unit vector the camera travels along when moving forward.
    pub fn forward(&self) -> DVec3 {
        DVec3::new(
            -self.yaw.cos() * self.pitch.cos(),
            -self.yaw.sin() * self.pitch.cos(),
            -self.pitch.sin(),
        )
    }

    /// Euclidean distance from the origin.
    pub fn distance(&self) -> f64 {
        self.position.length()
    }
}

/// Drawable surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_f32(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pose_is_default() {
        assert_eq!(CameraPose::default(), CameraPose::ZERO);
        assert_eq!(CameraPose::ZERO.distance(), 0.0);
    }

    #[test]
    fn forward_at_zero_angles_points_down_negative_x() {
        let fwd = CameraPose::ZERO.forward();
        assert!((fwd - DVec3::new(-1.0, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn forward_is_unit_length() {
        let pose = CameraPose::new(DVec3::ONE, 1.3, -0.4);
        assert!((pose.forward().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn viewport_conversion() {
        let vp = Viewport::new(1280, 720);
        assert_eq!(vp.as_f32(), [1280.0, 720.0]);
    }
}
