use std::f64::consts::{PI, TAU};

use dustmap_common::CameraPose;
use dustmap_common::rotation;
use glam::DMat4;
use dustmap_input::Action;
use serde::{Deserialize, Serialize};

use crate::intent::NavigationIntent;

/// Speeds and time constants for camera motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Yaw rate in rad/s at full deflection.
    pub yaw_speed: f64,
    /// Pitch rate in rad/s at full deflection.
    pub pitch_speed: f64,
    /// Forward speed in distance units/s, before the distance multiplier.
    pub forward_speed: f64,
    /// Homing decay time constant in seconds.
    pub homing_tau: f64,
    /// Below this magnitude homing snaps a value to exactly zero.
    pub snap_epsilon: f64,
    /// IdleOrbit: one full yaw turn every `orbit_period_ms`.
    pub orbit_period_ms: f64,
    /// IdleOrbit: pitch swing period.
    pub orbit_pitch_period_ms: f64,
    /// IdleOrbit: pitch swing amplitude in radians.
    pub orbit_pitch_amplitude: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            yaw_speed: TAU / 5.0,
            pitch_speed: TAU / 10.0,
            forward_speed: 0.1,
            homing_tau: 0.65,
            snap_epsilon: 1e-6,
            orbit_period_ms: 15_000.0,
            orbit_pitch_period_ms: 45_000.0,
            orbit_pitch_amplitude: 0.15 * PI,
        }
    }
}

/// Navigation mode as observed from outside the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    FreeFlight,
    Homing,
    /// Pose fixed from external parameters; rendered once, never integrated.
    Replay,
    /// Procedural time-driven motion with no interactive input source.
    IdleOrbit,
}

/// Where pose changes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    Interactive,
    Replay,
    IdleOrbit,
}

/// Camera kinematics state machine.
///
/// Holds no pose of its own: the session passes the pose and intent in, so
/// there is exactly one owner of each.
#[derive(Debug, Clone)]
pub struct CameraController {
    tuning: MotionTuning,
    driver: Driver,
    homing_enabled: bool,
}

impl CameraController {
    pub fn interactive(tuning: MotionTuning, homing_enabled: bool) -> Self {
        Self {
            tuning,
            driver: Driver::Interactive,
            homing_enabled,
        }
    }

    pub fn replay(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            driver: Driver::Replay,
            homing_enabled: false,
        }
    }

    pub fn idle_orbit(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            driver: Driver::IdleOrbit,
            homing_enabled: false,
        }
    }

    pub fn mode(&self, intent: &NavigationIntent) -> CameraMode {
        match self.driver {
            Driver::Replay => CameraMode::Replay,
            Driver::IdleOrbit => CameraMode::IdleOrbit,
            Driver::Interactive if intent.homing_active() => CameraMode::Homing,
            Driver::Interactive => CameraMode::FreeFlight,
        }
    }

    /// Apply a navigation action. Returns false when the action was ignored
    /// (non-interactive mode, disabled homing, or not a navigation action).
    pub fn apply(
        &self,
        action: Action,
        intent: &mut NavigationIntent,
        pose: &mut CameraPose,
    ) -> bool {
        if self.driver != Driver::Interactive {
            return false;
        }

        match action {
            Action::YawPress(dir) => intent.set_yaw_rate(dir.rate()),
            Action::YawRelease(dir) => {
                if intent.yaw_rate() == dir.rate() {
                    intent.set_yaw_rate(0);
                }
            }
            Action::PitchPress(dir) => intent.set_pitch_rate(dir.rate()),
            Action::PitchRelease(dir) => {
                if intent.pitch_rate() == dir.rate() {
                    intent.set_pitch_rate(0);
                }
            }
            Action::ToggleForward => intent.toggle_forward(),
            Action::ToggleBackward => intent.toggle_backward(),
            Action::ToggleHoming => {
                if !self.homing_enabled {
                    return false;
                }
                if intent.homing_active() {
                    intent.set_homing(false);
                    tracing::debug!("homing off");
                } else {
                    // Truncated remainder, so the sign of each angle survives.
                    pose.yaw %= TAU;
                    pose.pitch %= PI;
                    intent.set_homing(true);
                    tracing::debug!(yaw = pose.yaw, pitch = pose.pitch, "homing on");
                }
            }
            Action::TogglePause => return false,
        }
        true
    }

    /// Advance the pose by `dt_ms`. Does nothing when `dt_ms` is `None` (the
    /// clock's baseline sample), when it is not positive (the host clock went
    /// backwards or stood still), or in replay.
    pub fn advance(
        &self,
        pose: &mut CameraPose,
        intent: &NavigationIntent,
        dt_ms: Option<f64>,
        elapsed_ms: f64,
    ) {
        let Some(dt_ms) = dt_ms.filter(|dt| *dt > 0.0) else {
            return;
        };
        let dt = dt_ms / 1000.0;
        let t = &self.tuning;

        match self.driver {
            Driver::Replay => {}
            Driver::IdleOrbit => {
                pose.yaw = TAU * elapsed_ms / t.orbit_period_ms;
                pose.pitch =
                    t.orbit_pitch_amplitude * (TAU * elapsed_ms / t.orbit_pitch_period_ms).sin();
            }
            Driver::Interactive => {
                if !intent.homing_active() {
                    if intent.yaw_rate() != 0 {
                        pose.yaw += f64::from(intent.yaw_rate()) * t.yaw_speed * dt;
                    }
                    if intent.pitch_rate() != 0 {
                        pose.pitch += f64::from(intent.pitch_rate()) * t.pitch_speed * dt;
                    }
                }

                if intent.forward_rate() != 0 {
                    // Speed grows linearly with distance from the origin.
                    let speed_mod = 1.0 + pose.distance();
                    pose.position += pose.forward()
                        * speed_mod
                        * t.forward_speed
                        * f64::from(intent.forward_rate())
                        * dt;
                }

                if intent.homing_active() {
                    let decay = (-dt / t.homing_tau).exp();
                    pose.position *= decay;
                    pose.yaw *= decay;
                    pose.pitch *= decay;
                    self.snap_to_zero(pose);
                }
            }
        }
    }

    /// Camera rotation for the current pose.
    pub fn rotation(&self, pose: &CameraPose) -> DMat4 {
        rotation::compose(pose.pitch, pose.yaw)
    }

    fn snap_to_zero(&self, pose: &mut CameraPose) {
        let eps = self.tuning.snap_epsilon;
        let snap = |v: &mut f64| {
            if v.abs() < eps {
                *v = 0.0;
            }
        };
        snap(&mut pose.position.x);
        snap(&mut pose.position.y);
        snap(&mut pose.position.z);
        snap(&mut pose.yaw);
        snap(&mut pose.pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustmap_input::Direction;
    use glam::DVec3;

    fn interactive() -> CameraController {
        CameraController::interactive(MotionTuning::default(), true)
    }

    #[test]
    fn yaw_integration() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::YawPress(Direction::Positive), &mut intent, &mut pose);
        ctrl.advance(&mut pose, &intent, Some(500.0), 0.0);
        assert!((pose.yaw - 0.6283).abs() < 1e-4);
        assert_eq!(pose.pitch, 0.0);
    }

    #[test]
    fn pitch_integration_uses_pitch_speed() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::PitchPress(Direction::Negative), &mut intent, &mut pose);
        ctrl.advance(&mut pose, &intent, Some(1000.0), 0.0);
        assert!((pose.pitch + TAU / 10.0).abs() < 1e-12);
    }

    #[test]
    fn no_delta_means_no_motion() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        intent.set_yaw_rate(1);
        intent.toggle_forward();
        ctrl.advance(&mut pose, &intent, None, 0.0);
        assert_eq!(pose, CameraPose::ZERO);
    }

    #[test]
    fn release_stops_only_its_axis() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::YawPress(Direction::Positive), &mut intent, &mut pose);
        ctrl.apply(Action::PitchPress(Direction::Positive), &mut intent, &mut pose);
        ctrl.apply(
            Action::YawRelease(Direction::Positive),
            &mut intent,
            &mut pose,
        );
        assert_eq!(intent.yaw_rate(), 0);
        assert_eq!(intent.pitch_rate(), 1);
    }

    #[test]
    fn releasing_the_superseded_direction_keeps_the_held_one() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::YawPress(Direction::Negative), &mut intent, &mut pose);
        ctrl.apply(Action::YawPress(Direction::Positive), &mut intent, &mut pose);
        ctrl.apply(
            Action::YawRelease(Direction::Negative),
            &mut intent,
            &mut pose,
        );
        assert_eq!(intent.yaw_rate(), 1);

        ctrl.apply(Action::PitchPress(Direction::Positive), &mut intent, &mut pose);
        ctrl.apply(
            Action::PitchRelease(Direction::Negative),
            &mut intent,
            &mut pose,
        );
        assert_eq!(intent.pitch_rate(), 1);
        ctrl.apply(
            Action::PitchRelease(Direction::Positive),
            &mut intent,
            &mut pose,
        );
        assert_eq!(intent.pitch_rate(), 0);
    }

    #[test]
    fn backwards_clock_step_is_not_integrated() {
        let ctrl = interactive();
        let mut intent = NavigationIntent::default();
        intent.set_yaw_rate(1);
        intent.toggle_forward();
        let mut pose = CameraPose::new(DVec3::new(0.1, 0.0, 0.0), 0.2, 0.0);
        let start = pose;
        ctrl.advance(&mut pose, &intent, Some(-500.0), 0.0);
        ctrl.advance(&mut pose, &intent, Some(0.0), 0.0);
        assert_eq!(pose, start);

        intent.set_homing(true);
        ctrl.advance(&mut pose, &intent, Some(-500.0), 0.0);
        assert_eq!(pose, start);
        ctrl.advance(&mut pose, &intent, Some(16.0), 0.0);
        assert!(pose.distance() < start.distance());
    }

    #[test]
    fn forward_motion_scales_with_distance() {
        let ctrl = interactive();
        let mut intent = NavigationIntent::default();
        intent.toggle_forward();

        let mut near = CameraPose::ZERO;
        ctrl.advance(&mut near, &intent, Some(1000.0), 0.0);
        // Facing -x at zero angles, speed 0.1 * (1 + 0).
        assert!((near.position - DVec3::new(-0.1, 0.0, 0.0)).length() < 1e-12);

        let mut far = CameraPose::new(DVec3::new(9.0, 0.0, 0.0), 0.0, 0.0);
        ctrl.advance(&mut far, &intent, Some(1000.0), 0.0);
        assert!((far.position.x - (9.0 - 0.1 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn backward_motion_reverses_direction() {
        let ctrl = interactive();
        let mut intent = NavigationIntent::default();
        intent.toggle_backward();
        let mut pose = CameraPose::ZERO;
        ctrl.advance(&mut pose, &intent, Some(500.0), 0.0);
        assert!((pose.position.x - 0.05).abs() < 1e-12);
    }

    #[test]
    fn homing_decays_exponentially() {
        let ctrl = interactive();
        let mut pose = CameraPose::new(DVec3::new(1.0, 0.0, 0.0), 0.0, 0.0);
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::ToggleHoming, &mut intent, &mut pose);
        ctrl.advance(&mut pose, &intent, Some(650.0), 0.0);
        assert!((pose.position.x - 0.3679).abs() < 1e-4);
        assert_eq!(pose.position.y, 0.0);
    }

    #[test]
    fn homing_decay_matches_formula_for_any_step() {
        let tuning = MotionTuning {
            homing_tau: 1.3,
            ..MotionTuning::default()
        };
        let ctrl = CameraController::interactive(tuning, true);
        for dt in [1.0, 16.0, 250.0, 2000.0] {
            let mut pose = CameraPose::new(DVec3::new(2.0, -3.0, 0.5), 1.0, -0.5);
            let mut intent = NavigationIntent::default();
            intent.set_homing(true);
            ctrl.advance(&mut pose, &intent, Some(dt), 0.0);
            let k = (-dt / 1000.0 / 1.3).exp();
            assert!((pose.position - DVec3::new(2.0, -3.0, 0.5) * k).length() < 1e-12);
            assert!((pose.yaw - k).abs() < 1e-12);
            assert!((pose.pitch + 0.5 * k).abs() < 1e-12);
        }
    }

    #[test]
    fn homing_snaps_to_exact_zero() {
        let ctrl = interactive();
        let mut pose = CameraPose::new(DVec3::new(1e-3, 0.0, 0.0), 1e-3, 0.0);
        let mut intent = NavigationIntent::default();
        intent.set_homing(true);
        ctrl.advance(&mut pose, &intent, Some(10_000.0), 0.0);
        assert_eq!(pose, CameraPose::ZERO);
    }

    #[test]
    fn homing_entry_wraps_angles_and_clears_rates() {
        let ctrl = interactive();
        let mut pose = CameraPose::new(DVec3::ZERO, 7.0, -4.0);
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::YawPress(Direction::Positive), &mut intent, &mut pose);
        assert_eq!(ctrl.mode(&intent), CameraMode::FreeFlight);

        ctrl.apply(Action::ToggleHoming, &mut intent, &mut pose);
        assert_eq!(ctrl.mode(&intent), CameraMode::Homing);
        assert_eq!(intent.yaw_rate(), 0);
        assert!((pose.yaw - (7.0 - TAU)).abs() < 1e-12);
        assert!((pose.pitch - (-4.0 + PI)).abs() < 1e-12);

        ctrl.apply(Action::ToggleHoming, &mut intent, &mut pose);
        assert_eq!(ctrl.mode(&intent), CameraMode::FreeFlight);
        assert_eq!(intent.yaw_rate(), 0);
    }

    #[test]
    fn directional_press_leaves_homing() {
        let ctrl = interactive();
        let mut pose = CameraPose::ZERO;
        let mut intent = NavigationIntent::default();
        ctrl.apply(Action::ToggleHoming, &mut intent, &mut pose);
        ctrl.apply(Action::PitchPress(Direction::Positive), &mut intent, &mut pose);
        assert_eq!(ctrl.mode(&intent), CameraMode::FreeFlight);
    }

    #[test]
    fn disabled_homing_ignores_toggle() {
        let ctrl = CameraController::interactive(MotionTuning::default(), false);
        let mut pose = CameraPose::new(DVec3::ZERO, 7.0, 0.0);
        let mut intent = NavigationIntent::default();
        assert!(!ctrl.apply(Action::ToggleHoming, &mut intent, &mut pose));
        assert!(!intent.homing_active());
        assert_eq!(pose.yaw, 7.0);
    }

    #[test]
    fn replay_is_frozen() {
        let ctrl = CameraController::replay(MotionTuning::default());
        let start = CameraPose::new(DVec3::new(1.0, 2.0, 3.0), 0.3, 0.2);
        let mut pose = start;
        let mut intent = NavigationIntent::default();
        assert!(!ctrl.apply(Action::ToggleForward, &mut intent, &mut pose));
        assert_eq!(intent, NavigationIntent::default());
        ctrl.advance(&mut pose, &intent, Some(1000.0), 1000.0);
        assert_eq!(pose, start);
        assert_eq!(ctrl.mode(&intent), CameraMode::Replay);
    }

    #[test]
    fn idle_orbit_follows_elapsed_time() {
        let ctrl = CameraController::idle_orbit(MotionTuning::default());
        let mut pose = CameraPose::ZERO;
        let intent = NavigationIntent::default();
        ctrl.advance(&mut pose, &intent, Some(16.0), 7_500.0);
        assert!((pose.yaw - PI).abs() < 1e-12);
        let expected_pitch = 0.15 * PI * (TAU * 7_500.0 / 45_000.0).sin();
        assert!((pose.pitch - expected_pitch).abs() < 1e-12);
        assert_eq!(ctrl.mode(&intent), CameraMode::IdleOrbit);
    }

    #[test]
    fn rotation_at_zero_pose_is_base_orientation() {
        let ctrl = interactive();
        assert_eq!(
            ctrl.rotation(&CameraPose::ZERO),
            rotation::base_orientation()
        );
    }
}
