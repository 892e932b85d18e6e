//! Parameters of the raster line validator.
//!
//! Defaults follow the usual single-dish settings: validity thresholds of
//! 0.5 / 0.35 / 0.2, at most 100 clusters, 3σ clipping, and line widths
//! between 5 and 900 channels.

use crate::cluster::SelectionParams;
use crate::grid::ValidityThresholds;
use crate::surface::FitOrder;
use crate::windows::SynthesisParams;
use serde::{Deserialize, Serialize};

/// Every knob of the validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    pub threshold_valid: f64,
    pub threshold_marginal: f64,
    pub threshold_questionable: f64,
    /// Upper bound on the number of clusters tried.
    pub max_clusters: usize,
    /// Scale of the blob blur radius.
    pub blur_ratio: f64,
    /// Narrowest accepted fitted line width (channels).
    pub min_fwhm: f64,
    /// Widest accepted fitted line width (channels).
    pub max_fwhm: f64,
    /// Grid spacing along RA before the declination correction (degrees).
    pub grid_spacing_ra: f64,
    /// Grid spacing along Dec (degrees).
    pub grid_spacing_dec: f64,
    /// Halve automatic fit orders for broad lines.
    pub broad_component: bool,
    pub xorder: FitOrder,
    pub yorder: FitOrder,
    /// Sigma-clipping factor for clustering and surface fits.
    pub nsigma: f64,
    /// Width divisor applied before clustering.
    pub cluster_whiten: f64,
    pub kmeans_trials: usize,
    pub kmeans_max_restarts: usize,
    pub kmeans_seed: u64,
}

impl Default for ValidationParams {
    fn default() -> Self {
        let thresholds = ValidityThresholds::default();
        let selection = SelectionParams::default();
        Self {
            threshold_valid: thresholds.valid,
            threshold_marginal: thresholds.marginal,
            threshold_questionable: thresholds.questionable,
            max_clusters: selection.max_clusters,
            blur_ratio: 0.3,
            min_fwhm: 5.0,
            max_fwhm: 900.0,
            grid_spacing_ra: 0.0025,
            grid_spacing_dec: 0.0025,
            broad_component: false,
            xorder: FitOrder::Auto,
            yorder: FitOrder::Auto,
            nsigma: selection.nsigma,
            cluster_whiten: 1.0,
            kmeans_trials: selection.kmeans_trials,
            kmeans_max_restarts: selection.max_restarts,
            kmeans_seed: selection.seed,
        }
    }
}

impl ValidationParams {
    pub fn thresholds(&self) -> ValidityThresholds {
        ValidityThresholds {
            valid: self.threshold_valid,
            marginal: self.threshold_marginal,
            questionable: self.threshold_questionable,
        }
    }

    pub fn selection(&self) -> SelectionParams {
        SelectionParams {
            max_clusters: self.max_clusters,
            nsigma: self.nsigma,
            kmeans_trials: self.kmeans_trials,
            max_restarts: self.kmeans_max_restarts,
            seed: self.kmeans_seed,
        }
    }

    pub fn synthesis(&self, nchan: usize) -> SynthesisParams {
        SynthesisParams {
            thresholds: self.thresholds(),
            blur_ratio: self.blur_ratio,
            min_fwhm: self.min_fwhm,
            max_fwhm: self.max_fwhm,
            xorder: self.xorder,
            yorder: self.yorder,
            broad_component: self.broad_component,
            nsigma: self.nsigma,
            nchan,
        }
    }

    /// Whitening divisor, falling back to 1 when unusable.
    pub fn whiten(&self) -> f64 {
        if self.cluster_whiten.is_finite() && self.cluster_whiten > 0.0 {
            self.cluster_whiten
        } else {
            1.0
        }
    }
}
