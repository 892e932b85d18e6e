//! Detection stage: bin spectra and clustered candidates onto the grid.

use super::layout::GridLayout;
use super::plane::Plane;
use crate::types::{Candidate, SkyPosition};
use log::trace;

/// Raw per-cluster membership counts plus per-cell occupancy.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    pub layout: GridLayout,
    /// Number of spectra per cell, independent of clusters.
    pub occupancy: Plane<u32>,
    /// Indices of the spectra in each cell, in input order.
    pub spectra: Vec<Vec<usize>>,
    /// Raw score per cluster: count of included candidates per cell.
    pub scores: Vec<Plane<f64>>,
}

impl SpatialGrid {
    pub fn n_clusters(&self) -> usize {
        self.scores.len()
    }

    /// Spectrum indices binned into cell `(x, y)`.
    pub fn spectra_in(&self, x: usize, y: usize) -> &[usize] {
        &self.spectra[self.occupancy.idx(x, y)]
    }
}

/// Build the occupancy and raw cluster-score grids.
///
/// `category[i]` is the cluster of `candidates[i]`. Only included candidates
/// add to cluster scores. Positions that round off the grid are skipped.
pub fn build_grid(
    layout: GridLayout,
    positions: &[SkyPosition],
    candidates: &[Candidate],
    category: &[usize],
    n_clusters: usize,
) -> SpatialGrid {
    let mut occupancy = Plane::<u32>::new(layout.nra, layout.ndec);
    let mut spectra = vec![Vec::new(); layout.nra * layout.ndec];
    for (i, pos) in positions.iter().enumerate() {
        match layout.cell_of(pos) {
            Some((x, y)) => {
                let idx = occupancy.idx(x, y);
                occupancy.data[idx] += 1;
                spectra[idx].push(i);
            }
            None => trace!("spectrum {} at ({}, {}) is off the grid", i, pos.ra, pos.dec),
        }
    }

    let mut scores = vec![Plane::<f64>::new(layout.nra, layout.ndec); n_clusters];
    for (cand, &cluster) in candidates.iter().zip(category.iter()) {
        if !cand.included || cluster >= n_clusters {
            continue;
        }
        let Some((x, y)) = layout.cell_of(&cand.position) else {
            continue;
        };
        if let Some(v) = scores[cluster].get_mut_checked(x, y) {
            *v += 1.0;
        }
    }

    SpatialGrid {
        layout,
        occupancy,
        spectra,
        scores,
    }
}
