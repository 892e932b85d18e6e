//! Shared data model: spectra, candidate line segments, protect windows and
//! the per-call validation result.

use crate::diagnostics::ValidationReport;
use crate::validator::ObservingPattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one spectrum inside the current processing batch.
pub type SpectrumId = u64;

/// Inclusive channel range `[start, end]`.
///
/// `[-1, -1]` is the sentinel meaning "no line / no window".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct ChannelRange {
    pub start: i64,
    pub end: i64,
}

impl ChannelRange {
    pub const NONE: ChannelRange = ChannelRange { start: -1, end: -1 };

    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::NONE
    }

    /// Channel span `end - start`.
    pub fn width(&self) -> i64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.start + self.end) as f64
    }
}

impl From<[i64; 2]> for ChannelRange {
    fn from(v: [i64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<ChannelRange> for [i64; 2] {
    fn from(r: ChannelRange) -> Self {
        [r.start, r.end]
    }
}

impl fmt::Display for ChannelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Sky position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra: f64,
    pub dec: f64,
}

impl SkyPosition {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// One spectrum as delivered by the line finder: position plus candidate ranges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectrumLines {
    pub id: SpectrumId,
    pub ra: f64,
    pub dec: f64,
    /// Candidate ranges; `[[-1, -1]]` (or empty) denotes no detection.
    #[serde(default)]
    pub ranges: Vec<ChannelRange>,
}

impl SpectrumLines {
    pub fn new(id: SpectrumId, ra: f64, dec: f64, ranges: Vec<ChannelRange>) -> Self {
        Self { id, ra, dec, ranges }
    }

    pub fn position(&self) -> SkyPosition {
        SkyPosition::new(self.ra, self.dec)
    }

    /// True when at least one non-degenerate candidate is present.
    pub fn has_detection(&self) -> bool {
        self.ranges.iter().any(|r| r.start != r.end)
    }
}

/// One detected line segment before spatial validation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Candidate {
    /// Index of the owning spectrum in the input list.
    pub spectrum: usize,
    pub id: SpectrumId,
    pub position: SkyPosition,
    pub range: ChannelRange,
    /// Participates in the current clustering round (false = clipped outlier).
    pub included: bool,
}

impl Candidate {
    /// Clustering feature of this candidate.
    pub fn cluster_point(&self, whiten: f64) -> ClusterPoint {
        ClusterPoint {
            width: self.range.width() as f64 / whiten,
            center: self.range.center(),
        }
    }
}

/// Clustering feature: whitened width and center channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClusterPoint {
    pub width: f64,
    pub center: f64,
}

impl ClusterPoint {
    pub fn new(width: f64, center: f64) -> Self {
        Self { width, center }
    }

    pub fn distance(&self, other: &ClusterPoint) -> f64 {
        let dw = self.width - other.width;
        let dc = self.center - other.center;
        (dw * dw + dc * dc).sqrt()
    }
}

/// Build the candidate list from the line-finder output.
///
/// Zero-width ranges (which includes the `[-1, -1]` sentinel) are dropped.
pub fn collect_candidates(spectra: &[SpectrumLines]) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (idx, spec) in spectra.iter().enumerate() {
        for range in &spec.ranges {
            if range.start == range.end {
                continue;
            }
            out.push(Candidate {
                spectrum: idx,
                id: spec.id,
                position: spec.position(),
                range: *range,
                included: true,
            });
        }
    }
    out
}

/// Everything the engine needs for one call (one spectral window, one iteration).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationInput {
    /// Total number of spectral channels.
    pub nchan: usize,
    /// Spectral-window identifier, passed through untouched.
    #[serde(default)]
    pub spw: Option<i64>,
    /// Observing pattern: `RASTER`, `SINGLE-POINT` or `MULTI-POINT`.
    #[serde(default = "default_pattern")]
    pub pattern: ObservingPattern,
    /// Iteration counter of the parent pipeline.
    #[serde(default)]
    pub iteration: u32,
    pub spectra: Vec<SpectrumLines>,
}

fn default_pattern() -> ObservingPattern {
    ObservingPattern::Raster
}

impl ValidationInput {
    /// Raster input with default metadata.
    pub fn raster(nchan: usize, spectra: Vec<SpectrumLines>) -> Self {
        Self {
            nchan,
            spw: None,
            pattern: ObservingPattern::Raster,
            iteration: 0,
            spectra,
        }
    }
}

/// Final windows of one spectrum.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpectrumOutcome {
    pub windows: Vec<ChannelRange>,
    /// True when `windows` differs from the previously supplied list.
    pub changed: bool,
}

/// Representative properties of one cluster (a "channel-map range").
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub center: f64,
    pub width: f64,
    pub valid: bool,
    pub max_distance: f64,
}

/// Output of one engine call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationResult {
    pub spw: Option<i64>,
    pub windows: BTreeMap<SpectrumId, SpectrumOutcome>,
    /// Clusters sorted by center channel.
    pub clusters: Vec<ClusterSummary>,
    pub latency_ms: f64,
}

impl ValidationResult {
    /// Windows of one spectrum, if it was part of the input.
    pub fn windows_for(&self, id: SpectrumId) -> Option<&[ChannelRange]> {
        self.windows.get(&id).map(|o| o.windows.as_slice())
    }
}

/// Result and diagnostics returned by [`LineValidator::process_with_diagnostics`](crate::LineValidator).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedResult {
    pub result: ValidationResult,
    pub report: ValidationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_zero_width_ranges_are_not_candidates() {
        let spectra = vec![
            SpectrumLines::new(7, 1.0, 2.0, vec![ChannelRange::NONE]),
            SpectrumLines::new(8, 1.0, 2.0, vec![ChannelRange::new(10, 10), ChannelRange::new(3, 9)]),
        ];
        let cands = collect_candidates(&spectra);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].id, 8);
        assert_eq!(cands[0].spectrum, 1);
        assert_eq!(cands[0].range, ChannelRange::new(3, 9));
        assert!(!spectra[0].has_detection());
    }

    #[test]
    fn cluster_point_whitens_width() {
        let c = Candidate {
            spectrum: 0,
            id: 0,
            position: SkyPosition::new(0.0, 0.0),
            range: ChannelRange::new(100, 120),
            included: true,
        };
        let p = c.cluster_point(2.0);
        assert_eq!(p.width, 10.0);
        assert_eq!(p.center, 110.0);
    }

    #[test]
    fn channel_range_serializes_as_pair() {
        let json = serde_json::to_string(&vec![ChannelRange::new(1, 5)]).unwrap();
        assert_eq!(json, "[[1,5]]");
        let back: Vec<ChannelRange> = serde_json::from_str("[[-1,-1]]").unwrap();
        assert!(back[0].is_sentinel());
    }
}
