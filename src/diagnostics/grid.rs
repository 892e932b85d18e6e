use crate::grid::{GridLayout, ValidityThresholds};
use serde::Serialize;

/// Grid geometry and per-stage cluster validity.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStage {
    pub layout: GridLayout,
    pub thresholds: ValidityThresholds,
    /// Cells holding at least one spectrum.
    pub occupied_cells: usize,
    /// Spectra whose position fell off the grid.
    pub off_grid: usize,
    pub valid_after_validation: Vec<bool>,
    pub valid_after_smoothing: Vec<bool>,
    pub validation_ms: f64,
    pub smoothing_ms: f64,
}
