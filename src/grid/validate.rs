//! Validation stage: normalise raw cluster scores by local occupancy.

use super::plane::Plane;
use super::ValidityThresholds;

/// Upper bound of a validity score.
pub const MAX_VALIDITY: f64 = 3.0;

/// Normalise every cluster's raw score plane.
///
/// - empty cell: 0
/// - single spectrum that confirms the cluster (raw > valid): 1.0
/// - otherwise: `min(raw / sqrt(occupancy), 3.0)`
///
/// A cluster with no cell above the questionable threshold is invalid.
pub fn validate_grid(
    raw: &[Plane<f64>],
    occupancy: &Plane<u32>,
    thresholds: &ValidityThresholds,
) -> (Vec<Plane<f64>>, Vec<bool>) {
    let mut planes = Vec::with_capacity(raw.len());
    let mut valid = Vec::with_capacity(raw.len());
    for plane in raw {
        let mut out = plane.clone();
        for (v, &n) in out.data.iter_mut().zip(occupancy.data.iter()) {
            *v = cell_validity(*v, n, thresholds.valid);
        }
        valid.push(out.count_above(thresholds.questionable) > 0);
        planes.push(out);
    }
    (planes, valid)
}

fn cell_validity(raw: f64, occupancy: u32, valid: f64) -> f64 {
    match occupancy {
        0 => 0.0,
        1 if raw > valid => 1.0,
        n => (raw / (n as f64).sqrt()).min(MAX_VALIDITY),
    }
}
