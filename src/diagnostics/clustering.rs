use crate::cluster::ScoreSample;
use crate::types::ClusterSummary;
use serde::Serialize;

/// Report of the cluster-count search.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringStage {
    pub elapsed_ms: f64,
    pub candidates: usize,
    /// Candidates kept after sigma clipping.
    pub included: usize,
    pub score: f64,
    /// Median candidate width in channels.
    pub median_width: f64,
    /// Clusters sorted by center, widths in channels.
    pub clusters: Vec<ClusterSummary>,
    /// Every `(K, score)` evaluated, in evaluation order.
    pub trace: Vec<ScoreSample>,
    pub best_per_k: Vec<f64>,
    pub best_trial: usize,
}
