//! Window synthesis: turn validated cluster planes into protect windows.
//!
//! For every still-valid cluster the smoothed plane is split into blobs.
//! Each surviving blob gets a blurred support region and a surface fit over
//! its best-supported ("valid") cells. Spectra inside the valid cells take
//! the surface at their own position; spectra in the blurred rim take the
//! surface at the centre of the nearest valid cell.

use crate::diagnostics::BlobReport;
use crate::grid::{
    blurred_support, filter_blobs, find_blobs, Blob, Plane, SpatialGrid, ValidityThresholds,
};
use crate::surface::{fit_surface, FitOrder, SurfaceModel, SurfaceObservation};
use crate::types::{Candidate, ChannelRange, SkyPosition};
use log::{debug, trace, warn};

/// Channels added to the fitted width when forming the allowance.
const ALLOWANCE_PAD: f64 = 5.0;

/// Fitted edges closer than this to an integer channel are taken as that channel.
const CHANNEL_SNAP: f64 = 1e-6;

/// Knobs of the synthesis stage.
#[derive(Clone, Debug)]
pub struct SynthesisParams {
    pub thresholds: ValidityThresholds,
    pub blur_ratio: f64,
    pub min_fwhm: f64,
    pub max_fwhm: f64,
    pub xorder: FitOrder,
    pub yorder: FitOrder,
    pub broad_component: bool,
    pub nsigma: f64,
    pub nchan: usize,
}

/// Cluster planes entering synthesis.
pub struct SynthesisInput<'a> {
    pub grid: &'a SpatialGrid,
    /// Spectrum positions, indexed like [`SpatialGrid::spectra`] entries.
    pub positions: &'a [SkyPosition],
    pub candidates: &'a [Candidate],
    pub category: &'a [usize],
    /// Validated, unsmoothed validity per cluster.
    pub original: &'a [Plane<f64>],
    pub smoothed: &'a [Plane<f64>],
    pub valid: &'a [bool],
}

#[derive(Clone, Debug)]
pub struct SynthesisOutput {
    /// Unmerged protect windows per spectrum index.
    pub protect: Vec<Vec<ChannelRange>>,
    /// Per cluster: 2.0 on originally valid cells, 1.0 on other blurred support.
    pub final_planes: Vec<Plane<f64>>,
    pub valid: Vec<bool>,
    pub blobs: Vec<BlobReport>,
}

/// Protect window for a fitted `(center, width)`, or `None` when the width
/// lies outside `[min_fwhm, max_fwhm]` or the window misses the band.
pub fn protect_window(center: f64, width: f64, params: &SynthesisParams) -> Option<ChannelRange> {
    if params.nchan == 0 || !(center.is_finite() && width.is_finite()) {
        return None;
    }
    if width < params.min_fwhm || width > params.max_fwhm {
        return None;
    }
    let allowance = (width + ALLOWANCE_PAD).min(params.max_fwhm / 2.0);
    let last = params.nchan as i64 - 1;
    let lo = trunc_channel(center - allowance);
    let hi = trunc_channel(center + allowance);
    if hi < 0 || lo > last {
        return None;
    }
    Some(ChannelRange::new(lo.clamp(0, last), hi.clamp(0, last)))
}

fn trunc_channel(v: f64) -> i64 {
    let nearest = v.round();
    if (v - nearest).abs() < CHANNEL_SNAP {
        nearest as i64
    } else {
        v.trunc() as i64
    }
}

/// Run synthesis over all clusters.
pub fn synthesize_windows(input: &SynthesisInput<'_>, params: &SynthesisParams) -> SynthesisOutput {
    let grid = input.grid;
    let mut out = SynthesisOutput {
        protect: vec![Vec::new(); input.positions.len()],
        final_planes: input.smoothed.to_vec(),
        valid: input.valid.to_vec(),
        blobs: Vec::new(),
    };

    for cluster in 0..grid.n_clusters() {
        if !out.valid[cluster] {
            continue;
        }
        let mask = input.smoothed[cluster].above(params.thresholds.marginal);
        if mask.count() == 0 {
            debug!("cluster {cluster}: no cell above marginal");
            out.valid[cluster] = false;
            continue;
        }
        let original = &input.original[cluster];
        let blobs = filter_blobs(
            find_blobs(&mask, original, params.thresholds.valid),
            &grid.occupancy,
        );
        debug!("cluster {cluster}: {} blob(s) kept", blobs.len());

        let mut support_sum = Plane::<f64>::new(grid.layout.nra, grid.layout.ndec);
        for (blob_index, blob) in blobs.iter().enumerate() {
            let report = synthesize_blob(
                input,
                params,
                (cluster, blob_index),
                blob,
                &mut out.protect,
                &mut support_sum,
            );
            out.blobs.push(report);
        }

        out.valid[cluster] = support_sum.count_above(0.5) > 0;
        let mut plane = support_sum;
        for (x, y) in original.cells() {
            if original.get(x, y) > params.thresholds.valid {
                plane.set(x, y, 2.0);
            } else if plane.get(x, y) > 0.5 {
                plane.set(x, y, 1.0);
            }
        }
        out.final_planes[cluster] = plane;
    }
    out
}

fn synthesize_blob(
    input: &SynthesisInput<'_>,
    params: &SynthesisParams,
    (cluster, blob_index): (usize, usize),
    blob: &Blob,
    protect: &mut [Vec<ChannelRange>],
    support_sum: &mut Plane<f64>,
) -> BlobReport {
    let grid = input.grid;
    let layout = &grid.layout;
    let (nx, ny) = (layout.nra, layout.ndec);
    let original = &input.original[cluster];
    let smoothed = &input.smoothed[cluster];

    let mut blob_validity = Plane::<f64>::new(nx, ny);
    let mut valid_region = Plane::<bool>::new(nx, ny);
    for &(x, y) in &blob.cells {
        blob_validity.set(x, y, smoothed.get(x, y));
        if original.get(x, y) > params.thresholds.valid {
            valid_region.set(x, y, true);
        }
    }
    let support = blurred_support(
        &blob_validity,
        blob.real_members,
        params.blur_ratio,
        params.thresholds.marginal,
    );

    let mut report = BlobReport {
        cluster,
        blob: blob_index,
        members: blob.members(),
        real_members: blob.real_members,
        valid_cells: valid_region.count(),
        blurred_cells: support.count(),
        fit: None,
        windows: 0,
    };

    // x order follows the RA extent of the valid region, y order the Dec extent.
    let xorder = params
        .xorder
        .resolve(valid_region.occupied_columns(), params.broad_component);
    let yorder = params
        .yorder
        .resolve(valid_region.occupied_rows(), params.broad_component);
    let (Some(xorder), Some(yorder)) = (xorder, yorder) else {
        warn!("cluster {cluster}: blob without valid cells cannot be fitted, skipped");
        return report;
    };

    let observations = fit_observations(input, cluster, &valid_region);
    if observations.is_empty() {
        debug!("cluster {cluster}: blob has no fit data");
        return report;
    }
    let fit = fit_surface(&observations, xorder, yorder, params.nsigma);
    let Some(model) = fit.model.clone() else {
        warn!(
            "cluster {cluster}: singular surface fit over {} observation(s), blob skipped",
            observations.len()
        );
        report.fit = Some(fit);
        return report;
    };
    report.fit = Some(fit);

    let valid_cells: Vec<(usize, usize)> = valid_region
        .cells()
        .filter(|&(x, y)| valid_region.get(x, y))
        .collect();
    let aspect = layout.square_aspect();
    for (x, y) in support.cells() {
        if valid_region.get(x, y) {
            for &spectrum in grid.spectra_in(x, y) {
                let (fx, fy) = layout.to_frame(&input.positions[spectrum]);
                if let Some(w) = window_at(&model, fx, fy, params) {
                    protect[spectrum].push(w);
                    report.windows += 1;
                }
            }
        } else if support.get(x, y) {
            let Some((vx, vy)) = nearest_cell(&valid_cells, x, y, aspect) else {
                continue;
            };
            let (fx, fy) = layout.cell_center_frame(vx, vy);
            let Some(w) = window_at(&model, fx, fy, params) else {
                continue;
            };
            for &spectrum in grid.spectra_in(x, y) {
                protect[spectrum].push(w);
                report.windows += 1;
            }
        }
    }

    for (acc, &s) in support_sum.data.iter_mut().zip(support.data.iter()) {
        if s {
            *acc += 1.0;
        }
    }
    report
}

fn window_at(model: &SurfaceModel, x: f64, y: f64, params: &SynthesisParams) -> Option<ChannelRange> {
    let (center, width) = model.evaluate(x, y);
    protect_window(center, width, params)
}

/// Fit samples of one cluster inside `valid_region`.
///
/// Several candidates of one spectrum collapse into a single sample over
/// their common channels; a spectrum whose candidates share no channel
/// gives no sample.
fn fit_observations(
    input: &SynthesisInput<'_>,
    cluster: usize,
    valid_region: &Plane<bool>,
) -> Vec<SurfaceObservation> {
    let layout = &input.grid.layout;
    let mut merged: Vec<(usize, SkyPosition, ChannelRange)> = Vec::new();
    for (cand, &cat) in input.candidates.iter().zip(input.category.iter()) {
        if cat != cluster {
            continue;
        }
        let Some((x, y)) = layout.cell_of(&cand.position) else {
            continue;
        };
        if !valid_region.get(x, y) {
            continue;
        }
        match merged.iter_mut().find(|(s, _, _)| *s == cand.spectrum) {
            Some((_, _, range)) => {
                range.start = range.start.max(cand.range.start);
                range.end = range.end.min(cand.range.end);
            }
            None => merged.push((cand.spectrum, cand.position, cand.range)),
        }
    }
    merged
        .into_iter()
        .filter(|(spectrum, _, range)| {
            let overlapping = range.start <= range.end;
            if !overlapping {
                trace!("spectrum {spectrum}: candidates share no channel, not fitted");
            }
            overlapping
        })
        .map(|(_, pos, range)| {
            let (x, y) = layout.to_frame(&pos);
            SurfaceObservation {
                x,
                y,
                center: range.center(),
                width: range.width() as f64,
            }
        })
        .collect()
}

/// Nearest cell by `dx² · aspect + dy²`; the first minimum wins.
fn nearest_cell(cells: &[(usize, usize)], x: usize, y: usize, aspect: f64) -> Option<(usize, usize)> {
    let mut best = None;
    let mut best_d = f64::INFINITY;
    for &(cx, cy) in cells {
        let dx = cx as f64 - x as f64;
        let dy = cy as f64 - y as f64;
        let d = dx * dx * aspect + dy * dy;
        if d < best_d {
            best_d = d;
            best = Some((cx, cy));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{build_grid, GridLayout};

    /// One spectrum per cell of an `nx × ny` unit grid plus candidates of a
    /// single cluster.
    struct Scene {
        grid: SpatialGrid,
        positions: Vec<SkyPosition>,
        candidates: Vec<Candidate>,
        category: Vec<usize>,
        validity: Vec<Plane<f64>>,
    }

    impl Scene {
        /// `lines` lists `(x, y, range)`; a cell may carry several ranges.
        fn new(nx: usize, ny: usize, lines: &[(usize, usize, ChannelRange)]) -> Self {
            let layout = GridLayout {
                ra_min: 0.0,
                dec_min: 0.0,
                grid_ra: 1.0,
                grid_dec: 1.0,
                nra: nx,
                ndec: ny,
            };
            let cells: Vec<(usize, usize)> = Plane::<f64>::new(nx, ny).cells().collect();
            let positions: Vec<SkyPosition> = cells
                .iter()
                .map(|&(x, y)| SkyPosition::new(x as f64 + 0.5, y as f64 + 0.5))
                .collect();
            let mut validity = Plane::<f64>::new(nx, ny);
            let candidates: Vec<Candidate> = lines
                .iter()
                .map(|&(x, y, range)| {
                    validity.set(x, y, 1.0);
                    let spectrum = cells.iter().position(|&c| c == (x, y)).unwrap();
                    Candidate {
                        spectrum,
                        id: spectrum as u64,
                        position: positions[spectrum],
                        range,
                        included: true,
                    }
                })
                .collect();
            let category = vec![0; candidates.len()];
            let grid = build_grid(layout, &positions, &candidates, &category, 1);
            Self {
                grid,
                positions,
                candidates,
                category,
                validity: vec![validity],
            }
        }

        fn input(&self) -> SynthesisInput<'_> {
            SynthesisInput {
                grid: &self.grid,
                positions: &self.positions,
                candidates: &self.candidates,
                category: &self.category,
                original: &self.validity,
                smoothed: &self.validity,
                valid: &[true],
            }
        }

        fn spectrum_at(&self, x: usize, y: usize) -> usize {
            self.grid.spectra_in(x, y)[0]
        }
    }

    fn params(nchan: usize) -> SynthesisParams {
        SynthesisParams {
            thresholds: ValidityThresholds::default(),
            blur_ratio: 0.3,
            min_fwhm: 5.0,
            max_fwhm: 900.0,
            xorder: FitOrder::Auto,
            yorder: FitOrder::Auto,
            broad_component: false,
            nsigma: 3.0,
            nchan,
        }
    }

    #[test]
    fn allowance_is_width_plus_five() {
        let w = protect_window(110.0, 20.0, &params(1024)).unwrap();
        assert_eq!(w, ChannelRange::new(85, 135));
    }

    #[test]
    fn allowance_is_capped_by_half_max_fwhm() {
        let mut p = params(4096);
        p.max_fwhm = 100.0;
        let w = protect_window(1000.0, 80.0, &p).unwrap();
        assert_eq!(w, ChannelRange::new(950, 1050));
    }

    #[test]
    fn windows_are_clamped_to_the_band() {
        let p = params(128);
        assert_eq!(protect_window(3.0, 10.0, &p), Some(ChannelRange::new(0, 18)));
        assert_eq!(protect_window(125.0, 10.0, &p), Some(ChannelRange::new(110, 127)));
        assert_eq!(protect_window(-14.0, 10.0, &p), Some(ChannelRange::new(0, 1)));
        assert_eq!(protect_window(142.0, 10.0, &p), Some(ChannelRange::new(127, 127)));
        assert_eq!(protect_window(-30.0, 10.0, &p), None);
        assert_eq!(protect_window(150.0, 10.0, &p), None);
    }

    #[test]
    fn near_integer_edges_snap_before_truncation() {
        let p = params(1024);
        let w = protect_window(110.0 - 1e-11, 20.0 + 1e-12, &p).unwrap();
        assert_eq!(w, ChannelRange::new(85, 135));
        let w = protect_window(110.4, 20.0, &p).unwrap();
        assert_eq!(w, ChannelRange::new(85, 135));
    }

    #[test]
    fn widths_outside_limits_are_rejected() {
        let p = params(1024);
        assert!(protect_window(100.0, 4.0, &p).is_none());
        assert!(protect_window(100.0, 901.0, &p).is_none());
        assert!(protect_window(100.0, f64::NAN, &p).is_none());
        assert!(protect_window(100.0, 20.0, &params(0)).is_none());
    }

    #[test]
    fn nearest_cell_respects_aspect_and_scan_order() {
        let cells = vec![(0, 0), (2, 0), (0, 2)];
        // Equidistant along both axes with square cells: first in scan order.
        assert_eq!(nearest_cell(&cells, 1, 1, 1.0), Some((0, 0)));
        // Stretched RA cells: the Dec neighbour is closer.
        let cells = [(2, 1), (1, 2)];
        assert_eq!(nearest_cell(&cells, 1, 1, 1.0), Some((2, 1)));
        assert_eq!(nearest_cell(&cells, 1, 1, 4.0), Some((1, 2)));
        assert_eq!(nearest_cell(&[], 1, 1, 1.0), None);
    }

    #[test]
    fn singular_blob_is_skipped_without_affecting_its_neighbour() {
        let line_a = ChannelRange::new(100, 120);
        let line_b = ChannelRange::new(300, 320);
        let scene = Scene::new(
            9,
            1,
            &[
                (0, 0, line_a),
                (1, 0, line_a),
                (2, 0, line_a),
                (6, 0, line_b),
                (7, 0, line_b),
            ],
        );
        // Three samples carry a quadratic in x; the two-cell blob cannot.
        let mut p = params(1024);
        p.xorder = FitOrder::Fixed(2);
        p.yorder = FitOrder::Fixed(0);
        let out = synthesize_windows(&scene.input(), &p);

        assert_eq!(out.blobs.len(), 2);
        assert!(out.blobs[0].fitted());
        assert!(out.blobs[1].fit.as_ref().is_some_and(|f| f.is_singular()));
        assert_eq!(out.blobs[1].windows, 0);

        for x in 0..=3 {
            assert_eq!(
                out.protect[scene.spectrum_at(x, 0)],
                vec![ChannelRange::new(85, 135)],
                "cell {x}"
            );
        }
        for x in 4..9 {
            assert!(out.protect[scene.spectrum_at(x, 0)].is_empty(), "cell {x}");
        }

        assert!(out.valid[0]);
        let plane = &out.final_planes[0];
        assert_eq!(plane.get(2, 0), 2.0);
        assert_eq!(plane.get(3, 0), 1.0);
        // The skipped blob keeps its valid cells but contributes no rim.
        assert_eq!(plane.get(6, 0), 2.0);
        assert_eq!(plane.get(5, 0), 0.0);
        assert_eq!(plane.get(8, 0), 0.0);
    }

    #[test]
    fn cluster_with_only_singular_blobs_is_invalidated() {
        let line = ChannelRange::new(100, 120);
        let scene = Scene::new(5, 1, &[(0, 0, line), (1, 0, line), (2, 0, line)]);
        let mut p = params(1024);
        p.xorder = FitOrder::Fixed(5);
        let out = synthesize_windows(&scene.input(), &p);

        assert_eq!(out.blobs.len(), 1);
        assert!(!out.blobs[0].fitted());
        assert!(!out.valid[0]);
        assert!(out.protect.iter().all(|w| w.is_empty()));
    }

    #[test]
    fn same_spectrum_candidates_fit_their_common_channels() {
        let scene = Scene::new(
            3,
            1,
            &[
                (0, 0, ChannelRange::new(100, 120)),
                (0, 0, ChannelRange::new(104, 124)),
                (1, 0, ChannelRange::new(100, 120)),
                (1, 0, ChannelRange::new(130, 150)),
                (2, 0, ChannelRange::new(104, 120)),
            ],
        );
        let mut region = Plane::<bool>::new(3, 1);
        for x in 0..3 {
            region.set(x, 0, true);
        }
        let obs = fit_observations(&scene.input(), 0, &region);

        // Cell 1 has disjoint candidates and gives no sample.
        assert_eq!(obs.len(), 2);
        assert_eq!((obs[0].x, obs[0].center, obs[0].width), (0.5, 112.0, 16.0));
        assert_eq!((obs[1].x, obs[1].center, obs[1].width), (2.5, 112.0, 16.0));
    }

    #[test]
    fn automatic_orders_follow_ra_and_dec_extent() {
        let line = ChannelRange::new(100, 120);
        let scene = Scene::new(1, 3, &[(0, 0, line), (0, 1, line), (0, 2, line)]);
        let out = synthesize_windows(&scene.input(), &params(1024));

        let fit = out.blobs[0].fit.as_ref().unwrap();
        assert_eq!(fit.requested_order, (0, 2));
        assert!(!fit.is_singular());
        assert!(out.protect.iter().all(|w| w == &vec![ChannelRange::new(85, 135)]));
    }
}
