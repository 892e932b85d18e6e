use super::params::ValidationParams;
use super::pattern::ObservingPattern;
use crate::cluster::{select_clusters, ClusterSelection};
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{
    ClusterFlagMap, ClusteringStage, FlagStage, GridStage, InputDescriptor, SynthesisStage,
    ValidationReport,
};
use crate::grid::{build_grid, smooth_grid, validate_grid, GridLayout};
use crate::types::{
    collect_candidates, Candidate, ChannelRange, ClusterSummary, DetailedResult, SkyPosition,
    SpectrumId, SpectrumOutcome, ValidationInput, ValidationResult,
};
use crate::windows::history::windows_equal;
use crate::windows::{merge_windows, synthesize_windows, SynthesisInput};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

const DETECTION_THRESHOLDS: [f64; 2] = [1.5, 0.5];
const FINAL_THRESHOLDS: [f64; 4] = [1.5, 0.5, 0.5, 0.5];

/// Spatial line validator for one spectral window at a time.
///
/// Stateless between calls: the caller passes the previously stored windows
/// (see [`MaskHistory`](crate::windows::MaskHistory)) to obtain per-spectrum
/// change flags.
pub struct LineValidator {
    params: ValidationParams,
}

impl LineValidator {
    pub fn new(params: ValidationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ValidationParams {
        &self.params
    }

    /// Validate candidates and return the merged protect windows.
    pub fn process(
        &self,
        input: &ValidationInput,
        previous: &BTreeMap<SpectrumId, Vec<ChannelRange>>,
    ) -> ValidationResult {
        self.process_with_diagnostics(input, previous).result
    }

    /// Validate candidates and return the result with a stage-by-stage report.
    pub fn process_with_diagnostics(
        &self,
        input: &ValidationInput,
        previous: &BTreeMap<SpectrumId, Vec<ChannelRange>>,
    ) -> DetailedResult {
        let total_start = Instant::now();
        let mut candidates = collect_candidates(&input.spectra);
        debug!(
            "LineValidator::process start spectra={} candidates={} nchan={} pattern={}",
            input.spectra.len(),
            candidates.len(),
            input.nchan,
            input.pattern
        );
        let mut report = ValidationReport::new(InputDescriptor {
            spectra: input.spectra.len(),
            candidates: candidates.len(),
            nchan: input.nchan,
            pattern: input.pattern.to_string(),
            spw: input.spw,
            iteration: input.iteration,
        });

        let (protect, clusters) = match input.pattern {
            ObservingPattern::SinglePoint | ObservingPattern::MultiPoint => {
                info!("{} pattern: accepting all detected lines", input.pattern);
                (accept_all(input), Vec::new())
            }
            ObservingPattern::Raster if candidates.is_empty() => {
                info!("no line candidates: every spectrum gets the sentinel window");
                (vec![Vec::new(); input.spectra.len()], Vec::new())
            }
            ObservingPattern::Raster => self.run_raster(input, &mut candidates, &mut report),
        };

        let merge_start = Instant::now();
        let result_windows = collect_outcomes(input, &protect, previous);
        report.timings.record_since("merge", merge_start);
        if let Some(synthesis) = report.synthesis.as_mut() {
            synthesis.sentinel_spectra = result_windows
                .values()
                .filter(|o| o.windows.iter().all(|w| w.is_sentinel()))
                .count();
        }

        let latency_ms = elapsed_ms(total_start);
        report.timings.total_ms = latency_ms;
        debug!(
            "LineValidator::process done clusters={} latency_ms={:.3}",
            clusters.len(),
            latency_ms
        );
        DetailedResult {
            result: ValidationResult {
                spw: input.spw,
                windows: result_windows,
                clusters,
                latency_ms,
            },
            report,
        }
    }

    /// Raster branch: clustering, grid statistics and window synthesis.
    ///
    /// Returns unmerged protect windows per spectrum index and the cluster
    /// summaries.
    fn run_raster(
        &self,
        input: &ValidationInput,
        candidates: &mut [Candidate],
        report: &mut ValidationReport,
    ) -> (Vec<Vec<ChannelRange>>, Vec<ClusterSummary>) {
        let params = &self.params;
        let thresholds = params.thresholds();
        let whiten = params.whiten();
        let no_windows = vec![Vec::new(); input.spectra.len()];

        let cluster_start = Instant::now();
        let points: Vec<_> = candidates.iter().map(|c| c.cluster_point(whiten)).collect();
        let selection = select_clusters(&points, &params.selection());
        for (cand, &inc) in candidates.iter_mut().zip(selection.included.iter()) {
            cand.included = inc;
        }
        let cluster_ms = report.timings.record_since("clustering", cluster_start);
        let mut clusters = summarize(&selection, whiten);
        report.clustering = Some(ClusteringStage {
            elapsed_ms: cluster_ms,
            candidates: candidates.len(),
            included: selection.included.iter().filter(|&&i| i).count(),
            score: selection.score,
            median_width: selection.median_width * whiten,
            clusters: clusters.clone(),
            trace: selection.trace.clone(),
            best_per_k: selection.best_per_k.clone(),
            best_trial: selection.best_trial,
        });
        if selection.is_empty() {
            return (no_windows, clusters);
        }

        let grid_start = Instant::now();
        let positions: Vec<SkyPosition> = input.spectra.iter().map(|s| s.position()).collect();
        let Some(layout) =
            GridLayout::from_positions(&positions, params.grid_spacing_ra, params.grid_spacing_dec)
        else {
            warn!(
                "cannot derive a grid (spacing ra={} dec={}): no windows produced",
                params.grid_spacing_ra, params.grid_spacing_dec
            );
            return (no_windows, clusters);
        };
        let grid = build_grid(
            layout,
            &positions,
            candidates,
            &selection.category,
            selection.k(),
        );
        report.timings.record_since("grid", grid_start);
        debug!(
            "grid {}x{} cells, grid_ra={:.6} grid_dec={:.6}",
            layout.nra, layout.ndec, layout.grid_ra, layout.grid_dec
        );
        let mut flags = ClusterFlagMap::new(grid.n_clusters(), layout.nra, layout.ndec);
        flags.update(FlagStage::Detection, &grid.scores, &DETECTION_THRESHOLDS);

        let validation_start = Instant::now();
        let (validated, valid_after_validation) =
            validate_grid(&grid.scores, &grid.occupancy, &thresholds);
        let validation_ms = report.timings.record_since("validation", validation_start);
        let stage_thresholds = [thresholds.valid, thresholds.marginal, thresholds.questionable];
        flags.update(FlagStage::Validation, &validated, &stage_thresholds);

        let smoothing_start = Instant::now();
        let (smoothed, valid_after_smoothing) =
            smooth_grid(&validated, &valid_after_validation, thresholds.questionable);
        let smoothing_ms = report.timings.record_since("smoothing", smoothing_start);
        flags.update(FlagStage::Smoothing, &smoothed, &stage_thresholds);
        debug!(
            "valid clusters: validation={} smoothing={}",
            valid_after_validation.iter().filter(|&&v| v).count(),
            valid_after_smoothing.iter().filter(|&&v| v).count()
        );

        let off_grid = positions.iter().filter(|p| layout.cell_of(p).is_none()).count();
        report.grid = Some(GridStage {
            layout,
            thresholds,
            occupied_cells: grid.occupancy.data.iter().filter(|&&n| n > 0).count(),
            off_grid,
            valid_after_validation,
            valid_after_smoothing: valid_after_smoothing.clone(),
            validation_ms,
            smoothing_ms,
        });

        let synthesis_start = Instant::now();
        let synthesis = synthesize_windows(
            &SynthesisInput {
                grid: &grid,
                positions: &positions,
                candidates: &*candidates,
                category: &selection.category,
                original: &validated,
                smoothed: &smoothed,
                valid: &valid_after_smoothing,
            },
            &params.synthesis(input.nchan),
        );
        let synthesis_ms = report.timings.record_since("synthesis", synthesis_start);
        flags.update(FlagStage::Final, &synthesis.final_planes, &FINAL_THRESHOLDS);

        for (summary, &valid) in clusters.iter_mut().zip(synthesis.valid.iter()) {
            summary.valid = valid;
        }
        if let Some(stage) = report.clustering.as_mut() {
            stage.clusters = clusters.clone();
        }
        report.synthesis = Some(SynthesisStage {
            elapsed_ms: synthesis_ms,
            blobs: synthesis.blobs,
            valid: synthesis.valid,
            sentinel_spectra: 0,
        });
        report.cluster_flags = Some(flags);
        (synthesis.protect, clusters)
    }
}

/// Cluster summaries with widths scaled back to channels.
fn summarize(selection: &ClusterSelection, whiten: f64) -> Vec<ClusterSummary> {
    selection
        .clusters
        .iter()
        .map(|c| ClusterSummary {
            center: c.center,
            width: c.width * whiten,
            valid: c.valid,
            max_distance: c.max_distance,
        })
        .collect()
}

/// Sibling rule for pointed observations: every detected range is kept,
/// clamped into the band.
fn accept_all(input: &ValidationInput) -> Vec<Vec<ChannelRange>> {
    let last = input.nchan as i64 - 1;
    input
        .spectra
        .iter()
        .map(|s| {
            if last < 0 {
                return Vec::new();
            }
            s.ranges
                .iter()
                .filter(|r| !r.is_sentinel())
                .map(|r| ChannelRange::new(r.start.clamp(0, last), r.end.clamp(0, last)))
                .collect()
        })
        .collect()
}

/// Merge windows per spectrum id and compare against the previous call.
fn collect_outcomes(
    input: &ValidationInput,
    protect: &[Vec<ChannelRange>],
    previous: &BTreeMap<SpectrumId, Vec<ChannelRange>>,
) -> BTreeMap<SpectrumId, SpectrumOutcome> {
    let mut by_id: BTreeMap<SpectrumId, Vec<ChannelRange>> = BTreeMap::new();
    for (spec, windows) in input.spectra.iter().zip(protect.iter()) {
        by_id.entry(spec.id).or_default().extend_from_slice(windows);
    }
    by_id
        .into_iter()
        .map(|(id, raw)| {
            let windows = merge_windows(&raw);
            let changed = match previous.get(&id) {
                Some(prev) => !windows_equal(prev, &windows),
                None => !windows_equal(&[], &windows),
            };
            (id, SpectrumOutcome { windows, changed })
        })
        .collect()
}
