//! Sigma-clipped surface fit with polynomial order back-off.
//!
//! The fit runs as a small state machine:
//!
//! ```text
//! Fitting(x, y) --solve ok, 3 clip rounds--> Converged
//!      |  singular solve / too few survivors
//!      v
//! OrderReduced(x-1, y-1) --> Fitting          (from (0, 0): Singular)
//! ```

use super::poly::{NormalEquations, SurfaceModel};
use log::trace;
use serde::Serialize;

/// Clip rounds per order attempt.
const CLIP_ROUNDS: usize = 3;
/// Residuals at or below this are treated as an exact fit.
const CLIP_FLOOR: f64 = 1e-9;

/// One fit sample: a line's center and width at a grid-frame position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SurfaceObservation {
    pub x: f64,
    pub y: f64,
    pub center: f64,
    pub width: f64,
}

/// Result of [`fit_surface`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceFit {
    /// `None` when the fit ended singular.
    pub model: Option<SurfaceModel>,
    pub requested_order: (usize, usize),
    /// Orders actually used (after back-off).
    pub order: (usize, usize),
    pub order_reductions: usize,
    /// Observations excluded by the last clip round.
    pub clipped: usize,
    pub observations: usize,
}

impl SurfaceFit {
    pub fn is_singular(&self) -> bool {
        self.model.is_none()
    }
}

#[derive(Clone, Debug)]
enum FitState {
    Fitting { xorder: usize, yorder: usize },
    OrderReduced { xorder: usize, yorder: usize },
    Singular,
    Converged { model: SurfaceModel, clipped: usize },
}

enum Attempt {
    Converged { model: SurfaceModel, clipped: usize },
    Degenerate,
}

/// Fit center and width surfaces to `observations`.
///
/// Fewer observations than `max(xorder, yorder) + 1` is reported singular
/// without solving.
pub fn fit_surface(
    observations: &[SurfaceObservation],
    xorder: usize,
    yorder: usize,
    nsigma: f64,
) -> SurfaceFit {
    let mut fit = SurfaceFit {
        model: None,
        requested_order: (xorder, yorder),
        order: (xorder, yorder),
        order_reductions: 0,
        clipped: 0,
        observations: observations.len(),
    };

    let mut state = if observations.len() < xorder.max(yorder) + 1 {
        FitState::Singular
    } else {
        FitState::Fitting { xorder, yorder }
    };

    loop {
        state = match state {
            FitState::Fitting { xorder, yorder } => {
                fit.order = (xorder, yorder);
                match clipped_fit(observations, xorder, yorder, nsigma) {
                    Attempt::Converged { model, clipped } => FitState::Converged { model, clipped },
                    Attempt::Degenerate if xorder == 0 && yorder == 0 => FitState::Singular,
                    Attempt::Degenerate => FitState::OrderReduced {
                        xorder: xorder.saturating_sub(1),
                        yorder: yorder.saturating_sub(1),
                    },
                }
            }
            FitState::OrderReduced { xorder, yorder } => {
                fit.order_reductions += 1;
                trace!("surface fit: order reduced to ({xorder}, {yorder})");
                FitState::Fitting { xorder, yorder }
            }
            FitState::Singular => {
                fit.model = None;
                return fit;
            }
            FitState::Converged { model, clipped } => {
                fit.model = Some(model);
                fit.clipped = clipped;
                return fit;
            }
        };
    }
}

/// One fixed-order attempt: solve and clip `CLIP_ROUNDS` times.
fn clipped_fit(
    observations: &[SurfaceObservation],
    xorder: usize,
    yorder: usize,
    nsigma: f64,
) -> Attempt {
    let min_effective = xorder.max(yorder);
    let mut included = vec![true; observations.len()];
    let mut threshold = 0.0f64;
    let mut model = None;
    let mut clipped = 0usize;

    for round in 0..CLIP_ROUNDS {
        let mut ne = NormalEquations::new(xorder, yorder);
        for (obs, _) in observations.iter().zip(&included).filter(|(_, &inc)| inc) {
            ne.accumulate(obs.x, obs.y, obs.center, obs.width);
        }
        let Some(solved) = ne.solve() else {
            return Attempt::Degenerate;
        };

        let diffs: Vec<f64> = observations
            .iter()
            .map(|o| {
                let (c, w) = solved.evaluate(o.x, o.y);
                ((c - o.center).powi(2) + (w - o.width).powi(2)).sqrt()
            })
            .collect();
        let effective: Vec<f64> = diffs
            .iter()
            .zip(&included)
            .filter(|(_, &inc)| inc)
            .map(|(&d, _)| d)
            .collect();
        threshold = if effective.len() > 1 {
            let n = effective.len() as f64;
            let mean = effective.iter().sum::<f64>() / n;
            let var = effective.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
            mean + nsigma * var.sqrt()
        } else {
            threshold * 2.0
        };
        let limit = threshold.max(CLIP_FLOOR);
        for (flag, &d) in included.iter_mut().zip(&diffs) {
            *flag = d <= limit;
        }
        let kept = included.iter().filter(|&&f| f).count();
        clipped = observations.len() - kept;
        trace!(
            "surface fit ({xorder}, {yorder}) round {round}: threshold={threshold:.4} kept={kept}/{}",
            observations.len()
        );
        model = Some(solved);
        if kept == 0 || kept <= min_effective {
            return Attempt::Degenerate;
        }
    }

    match model {
        Some(model) => Attempt::Converged { model, clipped },
        None => Attempt::Degenerate,
    }
}
