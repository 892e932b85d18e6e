use crate::surface::SurfaceFit;
use serde::Serialize;

/// Outcome of one blob during window synthesis.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobReport {
    pub cluster: usize,
    /// Index among the cluster's surviving blobs.
    pub blob: usize,
    pub members: usize,
    pub real_members: usize,
    pub valid_cells: usize,
    pub blurred_cells: usize,
    /// `None` when the blob was skipped before fitting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<SurfaceFit>,
    /// Protect windows emitted by this blob.
    pub windows: usize,
}

impl BlobReport {
    pub fn fitted(&self) -> bool {
        self.fit.as_ref().is_some_and(|f| !f.is_singular())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisStage {
    pub elapsed_ms: f64,
    pub blobs: Vec<BlobReport>,
    /// Cluster validity after synthesis.
    pub valid: Vec<bool>,
    /// Spectra left with the sentinel window.
    pub sentinel_spectra: usize,
}
