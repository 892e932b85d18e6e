//! Spatial statistics over the RA/Dec raster grid.
//!
//! Stages, in pipeline order:
//! - [`layout`] / [`mapper`]: derive the grid and bin spectra and clustered
//!   candidates into occupancy and raw per-cluster score planes.
//! - [`validate`]: normalise raw scores into validity by local occupancy.
//! - [`smooth`]: distance-weighted 5×5 smoothing of validity.
//! - [`blobs`]: 8-connected components of the smoothed validity.
//! - [`dilate`]: circular dilation giving each blob's blurred support.

pub mod blobs;
pub mod dilate;
pub mod layout;
pub mod mapper;
pub mod plane;
pub mod smooth;
pub mod validate;

pub use blobs::{filter_blobs, find_blobs, Blob};
pub use dilate::blurred_support;
pub use layout::GridLayout;
pub use mapper::{build_grid, SpatialGrid};
pub use plane::Plane;
pub use smooth::{smooth_grid, smooth_plane};
pub use validate::{validate_grid, MAX_VALIDITY};

use serde::{Deserialize, Serialize};

/// Validity thresholds shared by the grid stages.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityThresholds {
    /// Cells above this are "valid": confirmed spatial support.
    pub valid: f64,
    /// Cells above this belong to a blob.
    pub marginal: f64,
    /// A cluster with no cell above this is dropped.
    pub questionable: f64,
}

impl Default for ValidityThresholds {
    fn default() -> Self {
        Self {
            valid: 0.5,
            marginal: 0.35,
            questionable: 0.2,
        }
    }
}
