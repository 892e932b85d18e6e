//! Circular dilation of a blob's support.
//!
//! The blur radius grows with the square root of the blob's real-member
//! count. The blob's validity is convolved with a flat circular kernel
//! (nearest-edge padding) and the result is thresholded, giving a support
//! region that reaches past the blob border.

use super::plane::Plane;
use std::f64::consts::PI;

/// Radius added to the area-derived term.
const BASE_RADIUS: f64 = 1.5;

/// Blur radius of a blob with `real_members` real members.
///
/// Returns `(radius, half_width)`: `radius` bounds the kernel disc and
/// `half_width` is the integer half-size of the kernel box. When the box
/// would exceed the grid along both axes it is shrunk to the larger axis.
pub fn blur_radius(real_members: usize, ratio: f64, nx: usize, ny: usize) -> (f64, usize) {
    let radius = (real_members as f64 / PI).sqrt() * ratio + BASE_RADIUS;
    let mut half = radius as usize;
    let span = 2 * half + 1;
    if nx < span && ny < span {
        half = (nx.max(ny).saturating_sub(1)) / 2;
    }
    (radius, half)
}

/// Flat circular kernel of half-size `half`; cells within `radius` are set.
pub fn circular_kernel(radius: f64, half: usize) -> Plane<bool> {
    let n = 2 * half + 1;
    let mut k = Plane::<bool>::new(n, n);
    for (x, y) in k.cells().collect::<Vec<_>>() {
        let dx = x as f64 - half as f64;
        let dy = y as f64 - half as f64;
        if (dx * dx + dy * dy).sqrt() <= radius {
            k.set(x, y, true);
        }
    }
    k
}

/// Sum of `plane` under `kernel` centred at each cell; off-grid samples
/// take the nearest edge value.
pub fn convolve_nearest(plane: &Plane<f64>, kernel: &Plane<bool>) -> Plane<f64> {
    let half_x = (kernel.nx / 2) as isize;
    let half_y = (kernel.ny / 2) as isize;
    let (nx, ny) = (plane.nx as isize, plane.ny as isize);
    let mut out = Plane::<f64>::new(plane.nx, plane.ny);
    if plane.nx == 0 || plane.ny == 0 {
        return out;
    }
    for (x, y) in plane.cells() {
        let mut sum = 0.0;
        for (kx, ky) in kernel.cells() {
            if !kernel.get(kx, ky) {
                continue;
            }
            let sx = (x as isize + kx as isize - half_x).clamp(0, nx - 1);
            let sy = (y as isize + ky as isize - half_y).clamp(0, ny - 1);
            sum += plane.get(sx as usize, sy as usize);
        }
        out.set(x, y, sum);
    }
    out
}

/// Blurred support of one blob.
///
/// `blob_validity` holds the blob's validity on its own cells and zero
/// elsewhere; the support is every cell whose convolved value exceeds
/// `threshold`.
pub fn blurred_support(
    blob_validity: &Plane<f64>,
    real_members: usize,
    ratio: f64,
    threshold: f64,
) -> Plane<bool> {
    let (radius, half) = blur_radius(real_members, ratio, blob_validity.nx, blob_validity.ny);
    let kernel = circular_kernel(radius, half);
    convolve_nearest(blob_validity, &kernel).above(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_grows_with_real_members() {
        let (r1, h1) = blur_radius(1, 0.3, 50, 50);
        let (r2, h2) = blur_radius(400, 0.3, 50, 50);
        assert!(r2 > r1);
        assert_eq!(h1, 1);
        assert_eq!(h2, 4, "sqrt(400/pi)*0.3+1.5 = {r2}");
    }

    #[test]
    fn kernel_is_clamped_to_small_grids() {
        // 9 real members on a 3x3 grid: radius ~2.0 would need a 5x5 box.
        let (radius, half) = blur_radius(9, 0.3, 3, 3);
        assert!(radius > 2.0);
        assert_eq!(half, 1);
        // Only one axis too small: no clamp.
        let (_, half) = blur_radius(9, 0.3, 3, 7);
        assert_eq!(half, 2);
    }

    #[test]
    fn kernel_excludes_far_corners() {
        let k = circular_kernel(2.0, 2);
        assert!(k.get(2, 2));
        assert!(k.get(0, 2));
        assert!(!k.get(0, 0), "corner at distance 2.83 lies outside");
        assert!(!k.get(1, 0), "offset (1, 2) at distance 2.24 lies outside");
        assert_eq!(k.count(), 13);
    }

    #[test]
    fn single_cell_dilates_to_a_disc() {
        let mut p = Plane::<f64>::new(7, 7);
        p.set(3, 3, 1.0);
        let support = blurred_support(&p, 1, 0.3, 0.35);
        // radius ~1.67, half-width 1: 3x3 box, corners at 1.41 inside.
        assert_eq!(support.count(), 9);
        assert!(support.get(2, 2));
        assert!(!support.get(1, 3));
    }

    #[test]
    fn edge_values_are_replicated() {
        let mut p = Plane::<f64>::new(3, 1);
        p.set(0, 0, 1.0);
        let k = circular_kernel(1.0, 1);
        let c = convolve_nearest(&p, &k);
        // At x=0: samples (-1 -> 0), (0), (1) along x and y replicated twice.
        assert_eq!(c.get(0, 0), 4.0);
        assert_eq!(c.get(1, 0), 1.0);
        assert_eq!(c.get(2, 0), 0.0);
    }
}
