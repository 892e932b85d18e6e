use line_validator::types::{ChannelRange, SpectrumId, SpectrumLines};

/// Raster step used by the synthetic maps; matches the default grid spacing.
pub const STEP: f64 = 0.0025;

/// Spectrum id of the raster point at column `x`, row `y`.
pub fn raster_id(x: usize, y: usize, nx: usize) -> SpectrumId {
    (y * nx + x) as SpectrumId
}

/// Regular `nx × ny` raster at Dec 0 whose candidate ranges come from `lines(x, y)`.
///
/// Points without a line carry the `[-1, -1]` sentinel like the line finder output.
pub fn raster<F>(nx: usize, ny: usize, mut lines: F) -> Vec<SpectrumLines>
where
    F: FnMut(usize, usize) -> Vec<ChannelRange>,
{
    assert!(nx > 0 && ny > 0, "raster dimensions must be positive");
    let mut out = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            let mut ranges = lines(x, y);
            if ranges.is_empty() {
                ranges.push(ChannelRange::NONE);
            }
            out.push(SpectrumLines::new(
                raster_id(x, y, nx),
                x as f64 * STEP,
                y as f64 * STEP,
                ranges,
            ));
        }
    }
    out
}
