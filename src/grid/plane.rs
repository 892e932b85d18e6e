//! Owned 2D cell buffer over the RA/Dec grid.
//!
//! Row-major with `x` (RA cell) varying fastest; `nx × ny` cells. Used for
//! validity scores (`f64`), masks (`bool`) and occupancy counts (`u32`).
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plane<T> {
    /// Number of cells along RA
    pub nx: usize,
    /// Number of cells along Dec
    pub ny: usize,
    /// Backing storage in row-major order
    pub data: Vec<T>,
}

impl<T: Copy + Default> Plane<T> {
    /// Construct a default-initialised plane of size `nx × ny`.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![T::default(); nx * ny],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.nx + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Mutable access when `(x, y)` lies inside the plane.
    #[inline]
    pub fn get_mut_checked(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.nx && y < self.ny {
            let i = self.idx(x, y);
            Some(&mut self.data[i])
        } else {
            None
        }
    }

    /// Same-sized plane produced by mapping every cell.
    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Plane<U> {
        Plane {
            nx: self.nx,
            ny: self.ny,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Cells in x-major scan order (`x` outer, `y` inner).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let (nx, ny) = (self.nx, self.ny);
        (0..nx).flat_map(move |x| (0..ny).map(move |y| (x, y)))
    }
}

impl Plane<f64> {
    /// Number of cells strictly above `threshold`.
    pub fn count_above(&self, threshold: f64) -> usize {
        self.data.iter().filter(|&&v| v > threshold).count()
    }

    /// Boolean mask of cells strictly above `threshold`.
    pub fn above(&self, threshold: f64) -> Plane<bool> {
        self.map(|v| v > threshold)
    }
}

impl Plane<bool> {
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Number of distinct RA columns holding at least one set cell.
    pub fn occupied_columns(&self) -> usize {
        (0..self.nx)
            .filter(|&x| (0..self.ny).any(|y| self.get(x, y)))
            .count()
    }

    /// Number of distinct Dec rows holding at least one set cell.
    pub fn occupied_rows(&self) -> usize {
        (0..self.ny)
            .filter(|&y| (0..self.nx).any(|x| self.get(x, y)))
            .count()
    }
}
