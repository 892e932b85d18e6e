//! Polynomial surfaces of line center and width over the grid plane.
//!
//! - [`poly`]: basis, evaluation and the shared normal-equation solve.
//! - [`fit`]: iterative sigma-clipped fit with order back-off.

pub mod fit;
pub mod poly;

pub use fit::{fit_surface, SurfaceFit, SurfaceObservation};
pub use poly::SurfaceModel;

use serde::{Deserialize, Serialize};

/// Highest polynomial order chosen automatically.
pub const MAX_AUTO_ORDER: usize = 5;

/// Polynomial order along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitOrder {
    /// Derived from the extent of the valid region.
    #[default]
    Auto,
    Fixed(usize),
}

impl FitOrder {
    /// Resolve against the number of occupied rows/columns of the valid region.
    ///
    /// `None` means the region cannot support even a constant term.
    pub fn resolve(self, occupied: usize, broad: bool) -> Option<usize> {
        match self {
            FitOrder::Fixed(n) => Some(n),
            FitOrder::Auto => auto_order(occupied, broad),
        }
    }
}

/// `trunc(min(occupied / b - 1, 5))` with `b = 2` for broad lines, else 1.
pub fn auto_order(occupied: usize, broad: bool) -> Option<usize> {
    let b = if broad { 2.0 } else { 1.0 };
    let order = (occupied as f64 / b - 1.0).min(MAX_AUTO_ORDER as f64).trunc();
    (order >= 0.0).then_some(order as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_order_follows_extent() {
        assert_eq!(auto_order(0, false), None);
        assert_eq!(auto_order(1, false), Some(0));
        assert_eq!(auto_order(3, false), Some(2));
        assert_eq!(auto_order(40, false), Some(5));
        assert_eq!(auto_order(1, true), Some(0));
        assert_eq!(auto_order(5, true), Some(1));
    }

    #[test]
    fn fixed_order_ignores_extent() {
        assert_eq!(FitOrder::Fixed(3).resolve(0, false), Some(3));
        assert_eq!(FitOrder::Auto.resolve(2, false), Some(1));
    }

    #[test]
    fn fit_order_from_json() {
        let auto: FitOrder = serde_json::from_str("\"auto\"").unwrap();
        let fixed: FitOrder = serde_json::from_str("{\"fixed\": 2}").unwrap();
        assert_eq!(auto, FitOrder::Auto);
        assert_eq!(fixed, FitOrder::Fixed(2));
    }
}
