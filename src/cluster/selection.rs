//! Model-order search over k-means solutions.
//!
//! For K = 1..max_clusters the selector runs several seeded k-means solves,
//! sigma-clips each cluster's members by their distance to the code, and
//! scores the solution by
//!
//! `(mean(distance · included) + median_width / 2) · (K + 1/K) · ((1 - member_rate)^0.5 + 1)^2`
//!
//! The lowest score wins (strict `<`, so the first evaluated solution wins
//! ties). The K loop stops once the best score of the last four K values
//! stops improving.

use super::kmeans::{assign, drop_empty_codes, kmeans};
use crate::types::ClusterPoint;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Knobs of the cluster-count search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Upper bound on K.
    pub max_clusters: usize,
    /// Sigma-clipping factor for cluster members.
    pub nsigma: f64,
    /// k-means initialisations per solve.
    pub kmeans_trials: usize,
    /// Cap on restarts per K (`min(K + 1, cap)` are run).
    pub max_restarts: usize,
    /// Seed applied afresh for every K.
    pub seed: u64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            max_clusters: 100,
            nsigma: 3.0,
            kmeans_trials: 50,
            max_restarts: 10,
            seed: 1234,
        }
    }
}

/// One cluster of the selected solution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Cluster {
    pub index: usize,
    /// Median center channel of included members.
    pub center: f64,
    /// Median (whitened) width of included members.
    pub width: f64,
    pub valid: bool,
    /// Largest member distance below the clipping threshold.
    pub max_distance: f64,
}

/// Score of one evaluated solution.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSample {
    pub requested_k: usize,
    pub clusters: usize,
    pub score: f64,
}

/// Output of [`select_clusters`].
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelection {
    pub clusters: Vec<Cluster>,
    /// Cluster index per point.
    pub category: Vec<usize>,
    /// Inclusion flag per point (false = clipped as outlier).
    pub included: Vec<bool>,
    pub score: f64,
    pub median_width: f64,
    /// Every evaluated solution, in evaluation order.
    pub trace: Vec<ScoreSample>,
    /// Best score per requested K.
    pub best_per_k: Vec<f64>,
    /// Index into `trace` of the winning solution.
    pub best_trial: usize,
}

impl ClusterSelection {
    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Reorder clusters by center channel and remap categories accordingly.
    pub fn sort_by_center(&mut self) {
        let mut order: Vec<usize> = (0..self.clusters.len()).collect();
        order.sort_by(|&a, &b| {
            self.clusters[a]
                .center
                .partial_cmp(&self.clusters[b].center)
                .unwrap_or(Ordering::Equal)
        });
        let mut remap = vec![0usize; order.len()];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            remap[old_idx] = new_idx;
        }
        let mut sorted: Vec<Cluster> = order.iter().map(|&i| self.clusters[i]).collect();
        for (i, c) in sorted.iter_mut().enumerate() {
            c.index = i;
        }
        self.clusters = sorted;
        for c in self.category.iter_mut() {
            *c = remap[*c];
        }
    }
}

struct Solution {
    clusters: Vec<Cluster>,
    category: Vec<usize>,
    included: Vec<bool>,
    score: f64,
}

/// Choose the number of clusters for the given points.
///
/// An empty point list yields an empty selection.
pub fn select_clusters(points: &[ClusterPoint], params: &SelectionParams) -> ClusterSelection {
    if points.is_empty() {
        return ClusterSelection::default();
    }
    let median_width = median(points.iter().map(|p| p.width).collect());
    let max_k = params.max_clusters.max(1);
    debug!(
        "cluster selection: points={} max_k={} median_width={:.3}",
        points.len(),
        max_k,
        median_width
    );

    let mut best: Option<Solution> = None;
    let mut trace_samples: Vec<ScoreSample> = Vec::new();
    let mut best_per_k: Vec<f64> = Vec::new();
    let mut best_trial = 0usize;

    for k in 1..=max_k {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let restarts = (k + 1).min(params.max_restarts.max(1));
        let mut k_best = f64::INFINITY;
        for _ in 0..restarts {
            let mut codebook = kmeans(points, k, params.kmeans_trials, &mut rng);
            let solution = stabilise_and_score(points, &mut codebook, params.nsigma, median_width);
            trace!(
                "k={} clusters={} score={:.5}",
                k,
                solution.clusters.len(),
                solution.score
            );
            trace_samples.push(ScoreSample {
                requested_k: k,
                clusters: solution.clusters.len(),
                score: solution.score,
            });
            k_best = k_best.min(solution.score);
            let better = match &best {
                Some(b) => solution.score < b.score,
                None => true,
            };
            if better {
                best_trial = trace_samples.len() - 1;
                best = Some(solution);
            }
        }
        best_per_k.push(k_best);
        debug!("k={} best score={:.5}", k, k_best);
        if plateau_reached(&best_per_k) {
            debug!("cluster count plateau reached at k={}", k);
            break;
        }
    }

    let Some(best) = best else {
        return ClusterSelection::default();
    };
    let mut selection = ClusterSelection {
        clusters: best.clusters,
        category: best.category,
        included: best.included,
        score: best.score,
        median_width,
        trace: trace_samples,
        best_per_k,
        best_trial,
    };
    selection.sort_by_center();
    debug!(
        "cluster selection: k={} score={:.5}",
        selection.k(),
        selection.score
    );
    selection
}

/// Reassign until no code is empty, then clip members and score the solution.
fn stabilise_and_score(
    points: &[ClusterPoint],
    codebook: &mut Vec<ClusterPoint>,
    nsigma: f64,
    median_width: f64,
) -> Solution {
    let (category, distance) = loop {
        let (category, distance) = assign(points, codebook);
        if !drop_empty_codes(codebook, &category) {
            break (category, distance);
        }
    };
    let n_clusters = codebook.len();

    let mut included = vec![true; points.len()];
    let mut outliers = 0usize;
    let mut thresholds = vec![0.0f64; n_clusters];
    for (nc, threshold) in thresholds.iter_mut().enumerate() {
        let members: Vec<f64> = distance
            .iter()
            .zip(category.iter())
            .filter(|(_, &c)| c == nc)
            .map(|(&d, _)| d)
            .collect();
        let (mean, std) = mean_std(&members);
        *threshold = mean + std * nsigma;
        for (i, (&d, &c)) in distance.iter().zip(category.iter()).enumerate() {
            if c == nc && d > *threshold {
                included[i] = false;
                outliers += 1;
            }
        }
    }
    let member_rate = (points.len() - outliers) as f64 / points.len() as f64;

    let mut clusters = Vec::with_capacity(n_clusters);
    for (nc, code) in codebook.iter().enumerate() {
        let mut max_distance = 0.0f64;
        let mut widths = Vec::new();
        let mut centers = Vec::new();
        for i in 0..points.len() {
            if category[i] != nc {
                continue;
            }
            if distance[i] < thresholds[nc] {
                max_distance = max_distance.max(distance[i]);
            }
            if included[i] {
                widths.push(points[i].width);
                centers.push(points[i].center);
            }
        }
        let (center, width) = if widths.is_empty() {
            (code.center, code.width)
        } else {
            (median(centers), median(widths))
        };
        clusters.push(Cluster {
            index: nc,
            center,
            width,
            valid: true,
            max_distance,
        });
    }

    let weighted: f64 = distance
        .iter()
        .zip(included.iter())
        .map(|(&d, &inc)| if inc { d } else { 0.0 })
        .sum::<f64>()
        / points.len() as f64;
    let k = n_clusters.max(1) as f64;
    let score = (weighted + 0.5 * median_width)
        * (k + 1.0 / k)
        * ((1.0 - member_rate).max(0.0).sqrt() + 1.0).powi(2);

    Solution {
        clusters,
        category,
        included,
        score,
    }
}

fn plateau_reached(best_per_k: &[f64]) -> bool {
    let n = best_per_k.len();
    if n <= 3 {
        return false;
    }
    let anchor = best_per_k[n - 4];
    best_per_k[n - 3..].iter().all(|&s| anchor <= s)
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

pub(crate) fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let m = values.len();
    if m % 2 == 1 {
        values[m / 2]
    } else {
        0.5 * (values[m / 2 - 1] + values[m / 2])
    }
}
