use dustmap_common::CameraPose;
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A fixed camera pose supplied from outside, angles in degrees.
///
/// `alpha` is the yaw and `beta` the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl PresetPose {
    /// Build a preset from optional parts.
    ///
    /// Returns `Ok(None)` when `x` is absent: a preset is present iff `x` is
    /// given. With `x` present every other part must be present and finite.
    pub fn from_parts(
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        alpha: Option<f64>,
        beta: Option<f64>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(x) = x else {
            return Ok(None);
        };
        let require = |name: &str, v: Option<f64>| -> Result<f64, ConfigError> {
            match v {
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(ConfigError::InvalidPreset(format!("{name} = {v} is not finite"))),
                None => Err(ConfigError::InvalidPreset(format!("{name} is missing"))),
            }
        };
        Ok(Some(Self {
            x: require("x", Some(x))?,
            y: require("y", y)?,
            z: require("z", z)?,
            alpha: require("alpha", alpha)?,
            beta: require("beta", beta)?,
        }))
    }

    /// Parse `x=..&y=..&z=..&alpha=..&beta=..`, with or without a leading `?`.
    /// Values are URL-decoded. Unknown keys are ignored.
    pub fn from_query(query: &str) -> Result<Option<Self>, ConfigError> {
        let mut parts = [None; 5];
        for (key, value) in query_pairs(query)? {
            let slot = match key.as_str() {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                "alpha" => 3,
                "beta" => 4,
                _ => continue,
            };
            let parsed = value.trim().parse::<f64>().map_err(|_| {
                ConfigError::InvalidPreset(format!("{key} = {value:?} is not a number"))
            })?;
            parts[slot] = Some(parsed);
        }
        let [x, y, z, alpha, beta] = parts;
        Self::from_parts(x, y, z, alpha, beta)
    }

    /// Keep a valid preset; log a malformed one and fall back to no preset,
    /// which puts the session in interactive mode at the zero pose.
    pub fn or_interactive(parsed: Result<Option<Self>, ConfigError>) -> Option<Self> {
        match parsed {
            Ok(preset) => preset,
            Err(err) => {
                tracing::warn!(%err, "ignoring preset pose, starting interactive");
                None
            }
        }
    }

    /// Convert to a pose, degrees to radians.
    pub fn to_pose(&self) -> CameraPose {
        CameraPose::new(
            DVec3::new(self.x, self.y, self.z),
            self.alpha.to_radians(),
            self.beta.to_radians(),
        )
    }
}

/// Split a URL query into decoded `(key, value)` pairs, in order.
pub(crate) fn query_pairs(query: &str) -> Result<Vec<(String, String)>, ConfigError> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

/// `application/x-www-form-urlencoded` decoding: `+` is a space and `%XX` a
/// byte. The decoded bytes must be UTF-8.
fn decode_component(raw: &str) -> Result<String, ConfigError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let byte = raw
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| ConfigError::InvalidQuery(format!("bad escape in {raw:?}")))?;
                out.push(byte);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out)
        .map_err(|_| ConfigError::InvalidQuery(format!("{raw:?} does not decode to UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn absent_x_means_no_preset() {
        assert_eq!(
            PresetPose::from_parts(None, Some(1.0), None, None, None).unwrap(),
            None
        );
        assert_eq!(PresetPose::from_query("y=2&alpha=30").unwrap(), None);
        assert_eq!(PresetPose::from_query("").unwrap(), None);
    }

    #[test]
    fn query_converts_degrees() {
        let preset = PresetPose::from_query("?x=1&y=-2&z=0.5&alpha=180&beta=-90")
            .unwrap()
            .unwrap();
        let pose = preset.to_pose();
        assert_eq!(pose.position, DVec3::new(1.0, -2.0, 0.5));
        assert!((pose.yaw - PI).abs() < 1e-12);
        assert!((pose.pitch + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn missing_part_is_invalid() {
        let err = PresetPose::from_query("x=1&y=2&z=3&alpha=10").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPreset(msg) if msg.contains("beta")));
    }

    #[test]
    fn garbage_number_is_invalid() {
        let err = PresetPose::from_query("x=1&y=abc&z=3&alpha=10&beta=0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPreset(_)));
    }

    #[test]
    fn non_finite_part_is_invalid() {
        let err =
            PresetPose::from_parts(Some(1.0), Some(f64::NAN), Some(0.0), Some(0.0), Some(0.0))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPreset(_)));
    }

    #[test]
    fn malformed_preset_falls_back_to_interactive() {
        assert_eq!(PresetPose::or_interactive(PresetPose::from_query("x=1")), None);
        let ok = PresetPose::or_interactive(PresetPose::from_query("x=1&y=0&z=0&alpha=0&beta=0"));
        assert_eq!(ok.map(|p| p.x), Some(1.0));
    }

    #[test]
    fn unknown_query_keys_are_ignored() {
        let preset = PresetPose::from_query("ver=b19&x=0&y=0&z=0&alpha=0&beta=0")
            .unwrap()
            .unwrap();
        assert_eq!(preset.to_pose(), CameraPose::ZERO);
    }

    #[test]
    fn query_values_are_url_decoded() {
        let preset = PresetPose::from_query("x=%2D1&y=+2&z=0%2E5&alpha=%2B90&beta=0")
            .unwrap()
            .unwrap();
        assert_eq!(preset.x, -1.0);
        assert_eq!(preset.y, 2.0);
        assert_eq!(preset.z, 0.5);
        assert_eq!(preset.alpha, 90.0);
    }

    #[test]
    fn broken_escape_is_invalid() {
        for query in ["x=%2&y=0", "x=%zz1", "x=%+1", "x=%FF"] {
            let err = PresetPose::from_query(query).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidQuery(_)), "{query}");
        }
    }

    #[test]
    fn query_pairs_decode_keys_and_keep_order() {
        let pairs = query_pairs("?ver=b19&&%61lpha=1&flag").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("ver".to_string(), "b19".to_string()),
                ("alpha".to_string(), "1".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
