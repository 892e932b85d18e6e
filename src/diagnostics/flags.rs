//! Per-cell cluster flags for plotting.
//!
//! Each stage adds `factor × (number of stage thresholds the cell exceeds)`
//! to a per-cluster integer plane, so every decimal digit of a flag records
//! one stage: units = detection, tens = validation, hundreds = smoothing,
//! thousands = final support.

use crate::grid::Plane;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagStage {
    Detection,
    Validation,
    Smoothing,
    Final,
}

impl FlagStage {
    pub fn factor(self) -> u16 {
        match self {
            FlagStage::Detection => 1,
            FlagStage::Validation => 10,
            FlagStage::Smoothing => 100,
            FlagStage::Final => 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageThresholds {
    pub stage: FlagStage,
    pub thresholds: Vec<f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFlagMap {
    pub planes: Vec<Plane<u16>>,
    pub stages: Vec<StageThresholds>,
}

impl ClusterFlagMap {
    pub fn new(n_clusters: usize, nx: usize, ny: usize) -> Self {
        Self {
            planes: vec![Plane::new(nx, ny); n_clusters],
            stages: Vec::new(),
        }
    }

    /// Add one stage's digit from its cluster planes.
    pub fn update(&mut self, stage: FlagStage, planes: &[Plane<f64>], thresholds: &[f64]) {
        let factor = stage.factor();
        for (flags, plane) in self.planes.iter_mut().zip(planes.iter()) {
            for (f, &v) in flags.data.iter_mut().zip(plane.data.iter()) {
                let hits = thresholds.iter().filter(|&&t| v > t).count() as u16;
                *f += factor * hits;
            }
        }
        self.stages.push(StageThresholds {
            stage,
            thresholds: thresholds.to_vec(),
        });
    }

    /// Digit of `stage` for one cell.
    pub fn digit(&self, cluster: usize, x: usize, y: usize, stage: FlagStage) -> u16 {
        (self.planes[cluster].get(x, y) / stage.factor()) % 10
    }
}
