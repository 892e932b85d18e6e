use crate::error::ValidatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spatial layout of the observation, selecting the validation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservingPattern {
    #[serde(rename = "SINGLE-POINT")]
    SinglePoint,
    #[serde(rename = "MULTI-POINT")]
    MultiPoint,
    #[serde(rename = "RASTER")]
    Raster,
}

impl ObservingPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            ObservingPattern::SinglePoint => "SINGLE-POINT",
            ObservingPattern::MultiPoint => "MULTI-POINT",
            ObservingPattern::Raster => "RASTER",
        }
    }

    /// Only raster maps carry enough spatial sampling for clustering.
    pub fn is_raster(self) -> bool {
        self == ObservingPattern::Raster
    }
}

impl FromStr for ObservingPattern {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE-POINT" => Ok(ObservingPattern::SinglePoint),
            "MULTI-POINT" => Ok(ObservingPattern::MultiPoint),
            "RASTER" => Ok(ObservingPattern::Raster),
            _ => Err(ValidatorError::UnsupportedPattern(s.to_string())),
        }
    }
}

impl fmt::Display for ObservingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
