//! 2D polynomial surface over the grid plane and its normal-equation solve.
//!
//! Terms are literal powers `x^j y^k` with `j <= xorder`, `k <= yorder`,
//! stored row-major with the x-degree varying fastest: coefficient index
//! `j + k * (xorder + 1)`.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Smallest accepted ratio between the smallest and largest LU pivot.
const MIN_PIVOT_RATIO: f64 = 1e-12;

/// Fitted line-center and line-width surfaces.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceModel {
    pub xorder: usize,
    pub yorder: usize,
    pub coeffs_center: Vec<f64>,
    pub coeffs_width: Vec<f64>,
}

impl SurfaceModel {
    /// Evaluate `(center, width)` at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        let basis = basis(x, y, self.xorder, self.yorder);
        let dot = |c: &[f64]| c.iter().zip(basis.iter()).map(|(a, b)| a * b).sum::<f64>();
        (dot(&self.coeffs_center), dot(&self.coeffs_width))
    }
}

pub fn n_terms(xorder: usize, yorder: usize) -> usize {
    (xorder + 1) * (yorder + 1)
}

/// Basis row `[x^j y^k]` in coefficient order.
pub fn basis(x: f64, y: f64, xorder: usize, yorder: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n_terms(xorder, yorder));
    let mut yk = 1.0;
    for _ in 0..=yorder {
        let mut xjyk = yk;
        for _ in 0..=xorder {
            out.push(xjyk);
            xjyk *= x;
        }
        yk *= y;
    }
    out
}

/// Shared normal matrix with two right-hand sides (center and width).
pub(crate) struct NormalEquations {
    xorder: usize,
    yorder: usize,
    ata: DMatrix<f64>,
    atb_center: DVector<f64>,
    atb_width: DVector<f64>,
    samples: usize,
}

impl NormalEquations {
    pub fn new(xorder: usize, yorder: usize) -> Self {
        let n = n_terms(xorder, yorder);
        Self {
            xorder,
            yorder,
            ata: DMatrix::zeros(n, n),
            atb_center: DVector::zeros(n),
            atb_width: DVector::zeros(n),
            samples: 0,
        }
    }

    pub fn accumulate(&mut self, x: f64, y: f64, center: f64, width: f64) {
        let row = basis(x, y, self.xorder, self.yorder);
        let n = row.len();
        for i in 0..n {
            for j in 0..n {
                self.ata[(i, j)] += row[i] * row[j];
            }
            self.atb_center[i] += row[i] * center;
            self.atb_width[i] += row[i] * width;
        }
        self.samples += 1;
    }

    /// Solve both systems. `None` when the normal matrix is singular or
    /// too ill-conditioned to trust.
    pub fn solve(self) -> Option<SurfaceModel> {
        if self.samples == 0 {
            return None;
        }
        let lu = self.ata.lu();
        let u = lu.u();
        let (mut min_pivot, mut max_pivot) = (f64::INFINITY, 0.0f64);
        for i in 0..u.nrows() {
            let p = u[(i, i)].abs();
            min_pivot = min_pivot.min(p);
            max_pivot = max_pivot.max(p);
        }
        let ratio = if max_pivot > 0.0 { min_pivot / max_pivot } else { 0.0 };
        if !ratio.is_finite() || ratio < MIN_PIVOT_RATIO {
            return None;
        }
        let center = lu.solve(&self.atb_center)?;
        let width = lu.solve(&self.atb_width)?;
        if center.iter().chain(width.iter()).any(|v| !v.is_finite()) {
            return None;
        }
        Some(SurfaceModel {
            xorder: self.xorder,
            yorder: self.yorder,
            coeffs_center: center.iter().copied().collect(),
            coeffs_width: width.iter().copied().collect(),
        })
    }
}
