//! Connected-component isolation of supported grid regions.
//!
//! Cells set in the mask are flood-filled with 8-connectivity. Every blob
//! records how many of its cells were already "valid" before smoothing (its
//! real members). [`filter_blobs`] then drops single-spectrum islands and blobs
//! that are weak compared with the strongest blob of the same cluster.

use super::plane::Plane;
use serde::Serialize;
use std::collections::VecDeque;

/// Largest real-member threshold applied by [`filter_blobs`].
const MAX_REAL_THRESHOLD: f64 = 3.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Member cells in discovery order.
    pub cells: Vec<(usize, usize)>,
    /// Member cells whose unsmoothed validity exceeded the valid threshold.
    pub real_members: usize,
}

impl Blob {
    pub fn members(&self) -> usize {
        self.cells.len()
    }
}

/// Flood-fill `mask` into 8-connected blobs.
///
/// `original` is the unsmoothed validity used to count real members.
pub fn find_blobs(mask: &Plane<bool>, original: &Plane<f64>, valid_threshold: f64) -> Vec<Blob> {
    let (nx, ny) = (mask.nx, mask.ny);
    let mut visited = Plane::<bool>::new(nx, ny);
    let mut blobs = Vec::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for (x, y) in mask.cells() {
        if !mask.get(x, y) || visited.get(x, y) {
            continue;
        }
        visited.set(x, y, true);
        queue.push_back((x, y));
        let mut cells = Vec::new();
        let mut real = 0usize;
        while let Some((cx, cy)) = queue.pop_front() {
            cells.push((cx, cy));
            if original.get(cx, cy) > valid_threshold {
                real += 1;
            }
            let x_lo = cx.saturating_sub(1);
            let x_hi = (cx + 1).min(nx - 1);
            let y_lo = cy.saturating_sub(1);
            let y_hi = (cy + 1).min(ny - 1);
            for nxi in x_lo..=x_hi {
                for nyi in y_lo..=y_hi {
                    if mask.get(nxi, nyi) && !visited.get(nxi, nyi) {
                        visited.set(nxi, nyi, true);
                        queue.push_back((nxi, nyi));
                    }
                }
            }
        }
        blobs.push(Blob {
            cells,
            real_members: real,
        });
    }
    blobs
}

/// Drop isolated single-spectrum blobs and blobs with too few real members.
///
/// A one-cell blob whose cell holds at most one spectrum is noise. Of the
/// rest, blobs with `real_members < min(0.5 · max(real_members), 3)` are
/// discarded; the maximum is taken over all blobs before filtering.
pub fn filter_blobs(blobs: Vec<Blob>, occupancy: &Plane<u32>) -> Vec<Blob> {
    let Some(max_real) = blobs.iter().map(|b| b.real_members).max() else {
        return blobs;
    };
    let threshold = (0.5 * max_real as f64).min(MAX_REAL_THRESHOLD);
    blobs
        .into_iter()
        .filter(|b| {
            if b.members() == 1 {
                let (x, y) = b.cells[0];
                if occupancy.get(x, y) <= 1 {
                    return false;
                }
            }
            (b.real_members as f64) >= threshold
        })
        .collect()
}
