/// Sign of a directional control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Rate contributed by this direction: +1 or -1.
    pub fn rate(self) -> i8 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }
}

/// A navigation action produced by the input router.
///
/// The camera controller consumes actions, never raw input events, so any
/// input source (keyboard, scripted replay, tests) drives the same state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start turning about the vertical axis.
    YawPress(Direction),
    /// Release of a yaw key. Stops turning only if that direction is the one
    /// currently driving the axis.
    YawRelease(Direction),
    /// Start tilting about the lateral axis.
    PitchPress(Direction),
    /// Release of a pitch key, matched against the current direction like
    /// [`Action::YawRelease`].
    PitchRelease(Direction),
    /// Cycle forward motion: off or backward becomes forward, forward becomes off.
    ToggleForward,
    /// Cycle backward motion: off or forward becomes backward, backward becomes off.
    ToggleBackward,
    /// Enter or leave homing.
    ToggleHoming,
    /// Pause or resume the render loop.
    TogglePause,
}

impl Action {
    /// True for actions that change the navigation intent.
    pub fn is_navigation(self) -> bool {
        !matches!(self, Action::TogglePause)
    }
}
