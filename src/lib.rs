#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;
pub mod validator;
pub mod windows;

// Stage modules – public for tools and tests, considered internals.
pub mod cluster;
pub mod grid;
pub mod surface;

// --- High-level re-exports -------------------------------------------------

// Main entry points: validator + results.
pub use crate::types::{ChannelRange, DetailedResult, SpectrumLines, ValidationInput, ValidationResult};
pub use crate::validator::{LineValidator, ObservingPattern, ValidationParams};

// Errors raised by the I/O helpers.
pub use crate::error::ValidatorError;

// High-level diagnostics returned by the validator.
pub use crate::diagnostics::ValidationReport;

// Cross-iteration bookkeeping and window merging.
pub use crate::windows::{merge_windows, MaskHistory};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use line_validator::prelude::*;
/// use std::collections::BTreeMap;
///
/// # fn main() {
/// let spectra = (0..9)
///     .map(|i| {
///         let (ra, dec) = ((i % 3) as f64 * 0.0025, (i / 3) as f64 * 0.0025);
///         SpectrumLines::new(i, ra, dec, vec![ChannelRange::new(100, 120)])
///     })
///     .collect();
/// let input = ValidationInput::raster(1024, spectra);
///
/// let validator = LineValidator::new(ValidationParams::default());
/// let result = validator.process(&input, &BTreeMap::new());
/// for (id, outcome) in &result.windows {
///     println!("{id}: {:?} changed={}", outcome.windows, outcome.changed);
/// }
/// # }
/// ```
pub mod prelude {
    pub use crate::types::{ChannelRange, SpectrumLines, ValidationInput};
    pub use crate::{LineValidator, MaskHistory, ValidationParams, ValidationResult};
}

// --- Stage-level API (for tools & advanced users) ---------------------------

pub mod stages {
    // Stage runners.
    pub use crate::cluster::{select_clusters, ClusterSelection, SelectionParams};
    pub use crate::grid::{
        build_grid, filter_blobs, find_blobs, smooth_grid, validate_grid, GridLayout, Plane,
        SpatialGrid, ValidityThresholds,
    };
    pub use crate::surface::{fit_surface, FitOrder, SurfaceFit, SurfaceModel, SurfaceObservation};
    pub use crate::windows::{synthesize_windows, SynthesisInput, SynthesisOutput, SynthesisParams};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        BlobReport, ClusterFlagMap, ClusteringStage, FlagStage, GridStage, InputDescriptor,
        StageTiming, SynthesisStage, TimingBreakdown,
    };
}
