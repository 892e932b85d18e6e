//! Plain Lloyd k-means over 2D cluster points with random restarts.
//!
//! Behaves like a classic vector-quantisation k-means: every trial seeds the
//! codebook with `k` distinct observations, iterates assignment/update until
//! the mean distortion settles, and drops codes that lose all members. The
//! codebook with the lowest distortion across trials wins.

use crate::types::ClusterPoint;
use rand::seq::index::sample;
use rand::Rng;

const DISTORTION_TOL: f64 = 1e-5;
const MAX_LLOYD_ITERS: usize = 300;

/// Nearest code for every point, with the Euclidean distance to it.
///
/// Ties resolve to the lowest code index.
pub(crate) fn assign(points: &[ClusterPoint], codebook: &[ClusterPoint]) -> (Vec<usize>, Vec<f64>) {
    let mut category = Vec::with_capacity(points.len());
    let mut distance = Vec::with_capacity(points.len());
    for p in points {
        let mut best = 0usize;
        let mut best_d = f64::INFINITY;
        for (ci, code) in codebook.iter().enumerate() {
            let d = p.distance(code);
            if d < best_d {
                best_d = d;
                best = ci;
            }
        }
        category.push(best);
        distance.push(best_d);
    }
    (category, distance)
}

/// Remove codes without members. Returns true when anything was dropped.
pub(crate) fn drop_empty_codes(codebook: &mut Vec<ClusterPoint>, category: &[usize]) -> bool {
    let mut used = vec![false; codebook.len()];
    for &c in category {
        if c < used.len() {
            used[c] = true;
        }
    }
    let before = codebook.len();
    let mut idx = 0;
    codebook.retain(|_| {
        let keep = used[idx];
        idx += 1;
        keep
    });
    codebook.len() != before
}

/// Run `trials` independent k-means solves and keep the lowest-distortion codebook.
///
/// The returned codebook may hold fewer than `k` codes when clusters collapse.
pub(crate) fn kmeans<R: Rng>(
    points: &[ClusterPoint],
    k: usize,
    trials: usize,
    rng: &mut R,
) -> Vec<ClusterPoint> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(points.len());
    let mut best: Option<(f64, Vec<ClusterPoint>)> = None;
    for _ in 0..trials.max(1) {
        let init: Vec<ClusterPoint> = sample(rng, points.len(), k)
            .into_iter()
            .map(|i| points[i])
            .collect();
        let (codebook, distortion) = lloyd(points, init);
        let better = match &best {
            Some((d, _)) => distortion < *d,
            None => true,
        };
        if better {
            best = Some((distortion, codebook));
        }
    }
    best.map(|(_, cb)| cb).unwrap_or_default()
}

fn lloyd(points: &[ClusterPoint], mut codebook: Vec<ClusterPoint>) -> (Vec<ClusterPoint>, f64) {
    let mut prev = f64::INFINITY;
    let mut distortion = f64::INFINITY;
    for _ in 0..MAX_LLOYD_ITERS {
        let (category, distance) = assign(points, &codebook);
        distortion = distance.iter().sum::<f64>() / points.len() as f64;

        let mut sums = vec![(0.0f64, 0.0f64, 0usize); codebook.len()];
        for (p, &c) in points.iter().zip(category.iter()) {
            sums[c].0 += p.width;
            sums[c].1 += p.center;
            sums[c].2 += 1;
        }
        codebook = sums
            .into_iter()
            .filter(|s| s.2 > 0)
            .map(|(w, c, n)| ClusterPoint::new(w / n as f64, c / n as f64))
            .collect();

        if (prev - distortion).abs() <= DISTORTION_TOL {
            break;
        }
        prev = distortion;
    }
    (codebook, distortion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn blob(center: f64, width: f64, n: usize) -> Vec<ClusterPoint> {
        (0..n)
            .map(|i| ClusterPoint::new(width + (i % 3) as f64 * 0.1, center + (i % 5) as f64 * 0.2))
            .collect()
    }

    #[test]
    fn kmeans_separates_two_groups() {
        let mut pts = blob(100.0, 20.0, 15);
        pts.extend(blob(400.0, 10.0, 15));
        let mut rng = StdRng::seed_from_u64(7);
        let mut cb = kmeans(&pts, 2, 10, &mut rng);
        cb.sort_by(|a, b| a.center.partial_cmp(&b.center).unwrap());
        assert_eq!(cb.len(), 2);
        assert!((cb[0].center - 100.4).abs() < 1.0, "got {:?}", cb);
        assert!((cb[1].center - 400.4).abs() < 1.0, "got {:?}", cb);
    }

    #[test]
    fn kmeans_is_reproducible_for_a_seed() {
        let mut pts = blob(50.0, 5.0, 10);
        pts.extend(blob(60.0, 8.0, 10));
        pts.extend(blob(300.0, 30.0, 10));
        let a = kmeans(&pts, 3, 5, &mut StdRng::seed_from_u64(11));
        let b = kmeans(&pts, 3, 5, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn identical_points_collapse_to_one_code() {
        let pts = vec![ClusterPoint::new(20.0, 110.0); 6];
        let cb = kmeans(&pts, 3, 4, &mut StdRng::seed_from_u64(1));
        assert_eq!(cb.len(), 1);
    }

    #[test]
    fn drop_empty_codes_keeps_order() {
        let mut cb = vec![
            ClusterPoint::new(0.0, 0.0),
            ClusterPoint::new(1.0, 1.0),
            ClusterPoint::new(2.0, 2.0),
        ];
        assert!(drop_empty_codes(&mut cb, &[0, 2, 2]));
        assert_eq!(cb, vec![ClusterPoint::new(0.0, 0.0), ClusterPoint::new(2.0, 2.0)]);
        assert!(!drop_empty_codes(&mut cb, &[0, 1]));
    }
}
