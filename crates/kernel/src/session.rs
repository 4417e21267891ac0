use dustmap_assets::TextureAtlas;
use dustmap_common::CameraPose;
use dustmap_input::{Action, InputRouter, Key, KeyState};
use glam::{DMat4, DVec3};

use crate::clock::FrameClock;
use crate::config::ViewerConfig;
use crate::controller::{CameraController, CameraMode};
use crate::intent::NavigationIntent;
use crate::preset::PresetPose;

/// One viewing session.
///
/// Owns the camera pose, the navigation intent, the frame clock, the
/// controller and the texture atlas. Everything that mutates them goes
/// through here on the render thread.
#[derive(Debug)]
pub struct Session<H> {
    pose: CameraPose,
    intent: NavigationIntent,
    clock: FrameClock,
    controller: CameraController,
    router: InputRouter,
    atlas: TextureAtlas<H>,
    frames: u64,
}

impl<H> Session<H> {
    /// Start a session. A preset pose selects replay when the config allows
    /// it; otherwise the session starts at the zero pose and is driven by the
    /// keyboard, or by the idle orbit if that feature is on.
    pub fn new(config: &ViewerConfig, atlas: TextureAtlas<H>, preset: Option<PresetPose>) -> Self {
        let motion = config.motion;
        let (controller, pose) = match preset {
            Some(preset) if config.features.preset_pose => {
                (CameraController::replay(motion), preset.to_pose())
            }
            _ if config.features.idle_orbit => {
                (CameraController::idle_orbit(motion), CameraPose::ZERO)
            }
            _ => (
                CameraController::interactive(motion, config.features.homing),
                CameraPose::ZERO,
            ),
        };

        let intent = NavigationIntent::default();
        tracing::info!(
            mode = ?controller.mode(&intent),
            dataset = %atlas.version(),
            tiles = atlas.tile_count(),
            "session created"
        );

        Self {
            pose,
            intent,
            clock: FrameClock::new(config.fps_ema_alpha),
            controller,
            router: InputRouter::new(config.keys.clone()),
            atlas,
            frames: 0,
        }
    }

    /// Route a key event. Navigation actions are applied here; anything else
    /// (pause) is handed back to the caller. Returns `None` when the key is
    /// unbound or the event produced nothing.
    pub fn handle_key(&mut self, key: Key, state: KeyState, repeat: bool) -> Option<Action> {
        let action = self.router.route(key, state, repeat)?;
        if action.is_navigation() {
            self.apply(action);
            None
        } else {
            Some(action)
        }
    }

    /// Apply a navigation action. Returns false if the controller ignored it.
    pub fn apply(&mut self, action: Action) -> bool {
        let applied = self
            .controller
            .apply(action, &mut self.intent, &mut self.pose);
        if applied {
            tracing::trace!(?action, intent = ?self.intent, "applied action");
        }
        applied
    }

    /// Tick the clock at `now_ms` and integrate the pose. Returns the frame
    /// delta, or `None` on the baseline tick.
    pub fn advance(&mut self, now_ms: f64, elapsed_ms: f64) -> Option<f64> {
        let dt = self.clock.tick(now_ms);
        self.controller
            .advance(&mut self.pose, &self.intent, dt, elapsed_ms);
        self.frames += 1;
        dt
    }

    /// Drop the clock baseline so the next tick does not integrate the time
    /// spent paused.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    pub fn rotation(&self) -> DMat4 {
        self.controller.rotation(&self.pose)
    }

    pub fn origin(&self) -> DVec3 {
        self.pose.position
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn intent(&self) -> &NavigationIntent {
        &self.intent
    }

    pub fn mode(&self) -> CameraMode {
        self.controller.mode(&self.intent)
    }

    pub fn fps(&self) -> Option<f64> {
        self.clock.sample().smoothed_fps
    }

    /// Ticks seen so far, including baseline ticks.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn atlas(&self) -> &TextureAtlas<H> {
        &self.atlas
    }

    pub fn atlas_mut(&mut self) -> &mut TextureAtlas<H> {
        &mut self.atlas
    }
}
