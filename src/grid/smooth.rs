//! Smoothing stage: distance-weighted average of validity over a 5×5
//! neighbourhood.
//!
//! Kernel weights (centre = 6, otherwise `1 / |offset|`, cells with
//! `|dx| + |dy| > 3` excluded):
//!
//! ```text
//! 0.0 0.4 0.5 0.4 0.0
//! 0.4 0.7 1.0 0.7 0.4
//! 0.5 1.0 6.0 1.0 0.5
//! 0.4 0.7 1.0 0.7 0.4
//! 0.0 0.4 0.5 0.4 0.0
//! ```
//!
//! Offsets falling off the grid are dropped from both the sum and the
//! normalisation.

use super::plane::Plane;

const CENTER_WEIGHT: f64 = 6.0;
const RADIUS: isize = 2;
const MAX_MANHATTAN: isize = 3;

/// Smooth every still-valid cluster plane. Invalid planes pass through.
///
/// A cluster is invalidated when no smoothed cell exceeds `questionable`.
pub fn smooth_grid(
    planes: &[Plane<f64>],
    valid: &[bool],
    questionable: f64,
) -> (Vec<Plane<f64>>, Vec<bool>) {
    let mut out = Vec::with_capacity(planes.len());
    let mut still_valid = Vec::with_capacity(planes.len());
    for (plane, &ok) in planes.iter().zip(valid.iter()) {
        let smoothed = if ok { smooth_plane(plane) } else { plane.clone() };
        still_valid.push(ok && smoothed.count_above(questionable) > 0);
        out.push(smoothed);
    }
    (out, still_valid)
}

/// Apply the kernel to one plane.
pub fn smooth_plane(plane: &Plane<f64>) -> Plane<f64> {
    let (nx, ny) = (plane.nx as isize, plane.ny as isize);
    let mut out = Plane::<f64>::new(plane.nx, plane.ny);
    for (x, y) in plane.cells() {
        let mut sum = 0.0f64;
        let mut weight = 0.0f64;
        for dx in -RADIUS..=RADIUS {
            for dy in -RADIUS..=RADIUS {
                if dx.abs() + dy.abs() > MAX_MANHATTAN {
                    continue;
                }
                let (cx, cy) = (x as isize + dx, y as isize + dy);
                if cx < 0 || cy < 0 || cx >= nx || cy >= ny {
                    continue;
                }
                let w = kernel_weight(dx, dy);
                sum += w * plane.get(cx as usize, cy as usize);
                weight += w;
            }
        }
        out.set(x, y, sum / weight);
    }
    out
}

fn kernel_weight(dx: isize, dy: isize) -> f64 {
    if dx == 0 && dy == 0 {
        CENTER_WEIGHT
    } else {
        1.0 / ((dx * dx + dy * dy) as f64).sqrt()
    }
}
