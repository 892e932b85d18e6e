//! Geometry of the RA/Dec binning grid.
//!
//! The grid covers the bounding box of all spectrum positions with an odd
//! number of cells per axis, centred on the data. RA spacing is stretched by
//! `1 / cos(mean Dec)` so that cells are square on the sky. RA is unwrapped
//! around the first position, so a raster straddling RA 0 stays compact.

use crate::types::SkyPosition;
use serde::Serialize;

const MIN_COS_DEC: f64 = 1e-6;
const FULL_TURN: f64 = 360.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    /// RA of the lower edge of cell column 0 (degrees, unwrapped: may fall
    /// outside `[0, 360)` for a raster straddling RA 0).
    pub ra_min: f64,
    /// Dec of the lower edge of cell row 0 (degrees).
    pub dec_min: f64,
    /// Curvature-corrected RA cell size (degrees).
    pub grid_ra: f64,
    pub grid_dec: f64,
    pub nra: usize,
    pub ndec: usize,
}

impl GridLayout {
    /// Derive the grid from spectrum positions.
    ///
    /// Returns `None` for an empty position list or a non-positive spacing.
    pub fn from_positions(positions: &[SkyPosition], spacing_ra: f64, spacing_dec: f64) -> Option<Self> {
        if positions.is_empty()
            || !(spacing_ra.is_finite() && spacing_ra > 0.0)
            || !(spacing_dec.is_finite() && spacing_dec > 0.0)
        {
            return None;
        }
        let n = positions.len() as f64;
        let mean_dec = positions.iter().map(|p| p.dec).sum::<f64>() / n;
        let cos_dec = mean_dec.to_radians().cos().abs().max(MIN_COS_DEC);
        let grid_ra = spacing_ra / cos_dec;
        let grid_dec = spacing_dec;

        let ra_ref = positions[0].ra;
        let (mut ra_lo, mut ra_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut dec_lo, mut dec_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in positions {
            let ra = ra_ref + wrap_offset(p.ra - ra_ref);
            ra_lo = ra_lo.min(ra);
            ra_hi = ra_hi.max(ra);
            dec_lo = dec_lo.min(p.dec);
            dec_hi = dec_hi.max(p.dec);
        }
        if !(ra_lo.is_finite() && ra_hi.is_finite() && dec_lo.is_finite() && dec_hi.is_finite()) {
            return None;
        }
        let wra = ra_hi - ra_lo;
        let wdec = dec_hi - dec_lo;
        let cra = ra_lo + 0.5 * wra;
        let cdec = dec_lo + 0.5 * wdec;

        let nra = odd_cell_count(wra, grid_ra);
        let ndec = odd_cell_count(wdec, grid_dec);
        let ra_min = cra - 0.5 * grid_ra - grid_ra * (nra - 1) as f64 / 2.0;
        let dec_min = cdec - 0.5 * grid_dec - grid_dec * (ndec - 1) as f64 / 2.0;

        Some(Self {
            ra_min,
            dec_min,
            grid_ra,
            grid_dec,
            nra,
            ndec,
        })
    }

    /// Cell holding the position, or `None` when rounding pushes it off the grid.
    pub fn cell_of(&self, pos: &SkyPosition) -> Option<(usize, usize)> {
        let (fx, fy) = self.to_frame(pos);
        if !(fx.is_finite() && fy.is_finite()) || fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (x, y) = (fx as usize, fy as usize);
        (x < self.nra && y < self.ndec).then_some((x, y))
    }

    /// Position in grid-frame units: fractional cell coordinates from the grid origin.
    pub fn to_frame(&self, pos: &SkyPosition) -> (f64, f64) {
        (
            wrap_offset(pos.ra - self.ra_min) / self.grid_ra,
            (pos.dec - self.dec_min) / self.grid_dec,
        )
    }

    /// Grid-frame coordinates of a cell centre.
    pub fn cell_center_frame(&self, x: usize, y: usize) -> (f64, f64) {
        (x as f64 + 0.5, y as f64 + 0.5)
    }

    /// Sky coordinates of a cell centre.
    pub fn cell_center(&self, x: usize, y: usize) -> SkyPosition {
        SkyPosition::new(
            (self.ra_min + self.grid_ra * (x as f64 + 0.5)).rem_euclid(FULL_TURN),
            self.dec_min + self.grid_dec * (y as f64 + 0.5),
        )
    }

    /// Squared aspect ratio `(grid_ra / grid_dec)^2` used for cell distances.
    pub fn square_aspect(&self) -> f64 {
        let a = self.grid_ra / self.grid_dec;
        a * a
    }
}

/// RA difference folded into `[-180, 180)`.
fn wrap_offset(d: f64) -> f64 {
    (d + 0.5 * FULL_TURN).rem_euclid(FULL_TURN) - 0.5 * FULL_TURN
}

fn odd_cell_count(width: f64, spacing: f64) -> usize {
    let half = ((0.5 * width - 0.5 * spacing) / spacing).trunc();
    let half = if half.is_finite() { half.max(-1.0) as i64 } else { 0 };
    (2 * (half + 1) + 1).max(1) as usize
}
