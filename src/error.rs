//! Errors raised at the crate's I/O edges.
//!
//! The validation engine itself never fails; these cover reading configs and
//! inputs, writing reports, and rejecting malformed input records.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported observing pattern '{0}' (expected RASTER, SINGLE-POINT or MULTI-POINT)")]
    UnsupportedPattern(String),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
