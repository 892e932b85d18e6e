use crate::diagnostics::{ClusterFlagMap, ClusteringStage, GridStage, SynthesisStage, TimingBreakdown};
use serde::Serialize;

/// End-to-end trace of one validator call.
///
/// Stages that did not run (no candidates, non-raster pattern) are `None`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering: Option<ClusteringStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_flags: Option<ClusterFlagMap>,
}

impl ValidationReport {
    pub fn new(input: InputDescriptor) -> Self {
        Self {
            input,
            timings: TimingBreakdown::default(),
            clustering: None,
            grid: None,
            synthesis: None,
            cluster_flags: None,
        }
    }

    /// Short human-readable summary, one line per stage.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "input: spectra={} candidates={} nchan={} pattern={}",
            self.input.spectra, self.input.candidates, self.input.nchan, self.input.pattern
        )];
        if let Some(c) = &self.clustering {
            lines.push(format!(
                "clustering: k={} score={:.4} included={}/{} ({:.2} ms)",
                c.clusters.len(),
                c.score,
                c.included,
                c.candidates,
                c.elapsed_ms
            ));
        }
        if let Some(g) = &self.grid {
            lines.push(format!(
                "grid: {}x{} cells, occupied={} off_grid={}",
                g.layout.nra, g.layout.ndec, g.occupied_cells, g.off_grid
            ));
        }
        if let Some(s) = &self.synthesis {
            let fitted = s.blobs.iter().filter(|b| b.fitted()).count();
            lines.push(format!(
                "synthesis: blobs={} fitted={} sentinel_spectra={} ({:.2} ms)",
                s.blobs.len(),
                fitted,
                s.sentinel_spectra,
                s.elapsed_ms
            ));
        }
        lines.push(format!("total: {:.2} ms", self.timings.total_ms));
        lines.join("\n")
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub spectra: usize,
    pub candidates: usize,
    pub nchan: usize,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spw: Option<i64>,
    pub iteration: u32,
}
