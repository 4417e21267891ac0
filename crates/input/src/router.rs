use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::{Action, Direction};

/// Host-independent key identifier.
///
/// Serialized as a short name: `left`, `right`, `up`, `down`, `space`, or a
/// single lowercase character such as `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Char(char),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct KeyParseError(pub String);

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "left" | "arrowleft" => Ok(Key::Left),
            "right" | "arrowright" => Ok(Key::Right),
            "up" | "arrowup" => Ok(Key::Up),
            "down" | "arrowdown" => Ok(Key::Down),
            "space" => Ok(Key::Space),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => Ok(Key::Char(c)),
                    _ => Err(KeyParseError(s.to_string())),
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Space => f.write_str("space"),
            Key::Char(c) => write!(f, "{c}"),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Logical controls a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    Forward,
    Backward,
    Home,
    Pause,
}

/// Key bindings for every control. Several keys may share one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub yaw_left: Vec<Key>,
    pub yaw_right: Vec<Key>,
    pub pitch_up: Vec<Key>,
    pub pitch_down: Vec<Key>,
    pub forward: Vec<Key>,
    pub backward: Vec<Key>,
    pub home: Vec<Key>,
    pub pause: Vec<Key>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            yaw_left: vec![Key::Left],
            yaw_right: vec![Key::Right],
            pitch_up: vec![Key::Up],
            pitch_down: vec![Key::Down],
            forward: vec![Key::Space, Key::Char('f')],
            backward: vec![Key::Char('d')],
            home: vec![Key::Char('h')],
            pause: vec![Key::Char('p')],
        }
    }
}

impl KeyBindings {
    /// First control bound to `key`, in declaration order.
    pub fn control_for(&self, key: Key) -> Option<Control> {
        [
            (&self.yaw_left, Control::YawLeft),
            (&self.yaw_right, Control::YawRight),
            (&self.pitch_up, Control::PitchUp),
            (&self.pitch_down, Control::PitchDown),
            (&self.forward, Control::Forward),
            (&self.backward, Control::Backward),
            (&self.home, Control::Home),
            (&self.pause, Control::Pause),
        ]
        .into_iter()
        .find(|(keys, _)| keys.contains(&key))
        .map(|(_, control)| control)
    }
}

/// Maps key events to navigation actions.
///
/// Directional controls are held: press starts motion on the axis and release
/// carries the released direction, so letting go of one key leaves the other
/// direction alone. Every other control is a toggle that
/// fires once per physical press; auto-repeat presses are dropped.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    bindings: KeyBindings,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn route(&self, key: Key, state: KeyState, repeat: bool) -> Option<Action> {
        let control = self.bindings.control_for(key)?;
        let action = match (control, state) {
            (Control::YawLeft, KeyState::Pressed) => Action::YawPress(Direction::Negative),
            (Control::YawRight, KeyState::Pressed) => Action::YawPress(Direction::Positive),
            (Control::YawLeft, KeyState::Released) => Action::YawRelease(Direction::Negative),
            (Control::YawRight, KeyState::Released) => Action::YawRelease(Direction::Positive),
            (Control::PitchUp, KeyState::Pressed) => Action::PitchPress(Direction::Positive),
            (Control::PitchDown, KeyState::Pressed) => Action::PitchPress(Direction::Negative),
            (Control::PitchUp, KeyState::Released) => Action::PitchRelease(Direction::Positive),
            (Control::PitchDown, KeyState::Released) => Action::PitchRelease(Direction::Negative),
            (_, KeyState::Released) => return None,
            (_, KeyState::Pressed) if repeat => return None,
            (Control::Forward, KeyState::Pressed) => Action::ToggleForward,
            (Control::Backward, KeyState::Pressed) => Action::ToggleBackward,
            (Control::Home, KeyState::Pressed) => Action::ToggleHoming,
            (Control::Pause, KeyState::Pressed) => Action::TogglePause,
        };
        tracing::trace!(%key, ?action, "routed key");
        Some(action)
    }
}
