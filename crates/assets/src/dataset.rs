use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AtlasError;

/// Published versions of the dust map, each with its own tile layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatasetVersion {
    #[default]
    B15,
    B19,
}

/// Distance-modulus bins covered by a dataset version.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceGrid {
    pub dm_min: f32,
    pub dm_max: f32,
    pub bins: u32,
}

impl DatasetVersion {
    pub const ALL: [DatasetVersion; 2] = [DatasetVersion::B15, DatasetVersion::B19];

    /// Token used in asset names and on the command line.
    pub fn token(self) -> &'static str {
        match self {
            DatasetVersion::B15 => "b15",
            DatasetVersion::B19 => "b19",
        }
    }

    /// Number of tiles composing the equirectangular texture.
    pub fn tile_count(self) -> u32 {
        match self {
            DatasetVersion::B15 => 4,
            DatasetVersion::B19 => 15,
        }
    }

    pub fn distance_grid(self) -> DistanceGrid {
        match self {
            DatasetVersion::B15 => DistanceGrid {
                dm_min: 4.0,
                dm_max: 19.0,
                bins: 31,
            },
            DatasetVersion::B19 => DistanceGrid {
                dm_min: 4.0,
                dm_max: 18.875,
                bins: 120,
            },
        }
    }
}

impl FromStr for DatasetVersion {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetVersion::ALL
            .into_iter()
            .find(|v| v.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AtlasError::UnknownVersion(s.to_string()))
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl TryFrom<String> for DatasetVersion {
    type Error = AtlasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatasetVersion> for String {
    fn from(version: DatasetVersion) -> Self {
        version.token().to_string()
    }
}
