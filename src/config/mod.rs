//! JSON runtime configuration and input/output helpers for the demo tools.

use crate::error::{Result, ValidatorError};
use crate::types::ValidationInput;
use crate::validator::ValidationParams;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
    pub format: OutputFormat,
    /// Where to store the mask history between runs.
    pub history: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    pub input_path: PathBuf,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub params: ValidationParams,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let mut config: RuntimeConfig = read_json(path)?;
    if config.input_path.is_relative() {
        if let Some(dir) = path.parent() {
            config.input_path = dir.join(&config.input_path);
        }
    }
    Ok(config)
}

/// Read and check a validation input.
///
/// Rejects non-finite positions and ranges with `start > end` other than the
/// sentinel; duplicate spectrum ids are accepted and their windows merged.
pub fn load_input(path: &Path) -> Result<ValidationInput> {
    let input: ValidationInput = read_json(path)?;
    check_input(&input)?;
    Ok(input)
}

pub fn check_input(input: &ValidationInput) -> Result<()> {
    if input.nchan == 0 {
        return Err(ValidatorError::InvalidInput("nchan must be positive".into()));
    }
    let mut seen = HashSet::new();
    for spec in &input.spectra {
        if !(spec.ra.is_finite() && spec.dec.is_finite()) {
            return Err(ValidatorError::InvalidInput(format!(
                "spectrum {} has a non-finite position",
                spec.id
            )));
        }
        if let Some(r) = spec
            .ranges
            .iter()
            .find(|r| !r.is_sentinel() && (r.start > r.end || r.start < 0))
        {
            return Err(ValidatorError::InvalidInput(format!(
                "spectrum {} has malformed range {r}",
                spec.id
            )));
        }
        if !seen.insert(spec.id) {
            log::debug!("spectrum id {} appears more than once", spec.id);
        }
    }
    Ok(())
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|source| ValidatorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ValidatorError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| ValidatorError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| ValidatorError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelRange, SpectrumLines};
    use crate::validator::ObservingPattern;

    #[test]
    fn input_json_uses_defaults() {
        let json = r#"{
            "nchan": 512,
            "spectra": [
                {"id": 0, "ra": 10.0, "dec": -5.0, "ranges": [[100, 120]]},
                {"id": 1, "ra": 10.01, "dec": -5.0, "ranges": [[-1, -1]]}
            ]
        }"#;
        let input: ValidationInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.pattern, ObservingPattern::Raster);
        assert_eq!(input.iteration, 0);
        assert_eq!(input.spectra[0].ranges, vec![ChannelRange::new(100, 120)]);
        assert!(check_input(&input).is_ok());
    }

    #[test]
    fn unknown_pattern_fails_to_parse() {
        let json = r#"{"nchan": 8, "pattern": "SPIRAL", "spectra": []}"#;
        assert!(serde_json::from_str::<ValidationInput>(json).is_err());
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        let input = ValidationInput::raster(
            64,
            vec![SpectrumLines::new(3, 0.0, 0.0, vec![ChannelRange::new(20, 10)])],
        );
        let err = check_input(&input).unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidInput(_)), "got {err}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_input(Path::new("/nonexistent/input.json")).unwrap_err();
        assert!(matches!(err, ValidatorError::Io { .. }));
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("line-validator-{}", std::process::id()));
        let path = dir.join("input.json");
        let json = r#"{"nchan": 32, "pattern": "MULTI-POINT", "spectra": [{"id": 9, "ra": 1.0, "dec": 2.0}]}"#;
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, json).unwrap();
        let input = load_input(&path).unwrap();
        assert_eq!(input.pattern, ObservingPattern::MultiPoint);
        assert!(input.spectra[0].ranges.is_empty());
        write_json_file(&dir.join("out/params.json"), &ValidationParams::default()).unwrap();
        assert!(dir.join("out/params.json").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
