/// What the operator is currently asking the camera to do.
///
/// Rates are -1, 0 or +1. Turning homing on clears every rate, and setting
/// any rate to a non-zero value turns homing off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationIntent {
    yaw_rate: i8,
    pitch_rate: i8,
    forward_rate: i8,
    homing_active: bool,
}

impl NavigationIntent {
    pub fn yaw_rate(&self) -> i8 {
        self.yaw_rate
    }

    pub fn pitch_rate(&self) -> i8 {
        self.pitch_rate
    }

    pub fn forward_rate(&self) -> i8 {
        self.forward_rate
    }

    pub fn homing_active(&self) -> bool {
        self.homing_active
    }

    pub fn set_yaw_rate(&mut self, rate: i8) {
        self.yaw_rate = rate.signum();
        self.cancel_homing_if(rate != 0);
    }

    pub fn set_pitch_rate(&mut self, rate: i8) {
        self.pitch_rate = rate.signum();
        self.cancel_homing_if(rate != 0);
    }

    pub fn set_forward_rate(&mut self, rate: i8) {
        self.forward_rate = rate.signum();
        self.cancel_homing_if(rate != 0);
    }

    /// Forward control: off or backward becomes forward, forward becomes off.
    pub fn toggle_forward(&mut self) {
        let next = if self.forward_rate == 1 { 0 } else { 1 };
        self.set_forward_rate(next);
    }

    /// Backward control: off or forward becomes backward, backward becomes off.
    pub fn toggle_backward(&mut self) {
        let next = if self.forward_rate == -1 { 0 } else { -1 };
        self.set_forward_rate(next);
    }

    pub fn set_homing(&mut self, active: bool) {
        self.homing_active = active;
        if active {
            self.yaw_rate = 0;
            self.pitch_rate = 0;
            self.forward_rate = 0;
        }
    }

    fn cancel_homing_if(&mut self, cond: bool) {
        if cond {
            self.homing_active = false;
        }
    }
}
