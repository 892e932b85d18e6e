//! Line validator orchestrating the spatial validation pipeline.
//!
//! Overview
//! - Collects candidate line ranges from every spectrum and groups them in
//!   (width, center) space with a model-order search over k-means solutions.
//! - Bins spectra onto an RA/Dec grid and turns per-cluster membership into
//!   validity scores normalised by local occupancy, then smooths them.
//! - Splits each surviving cluster into spatial blobs, fits center and width
//!   surfaces over the well-supported cells and emits protect windows for
//!   the blob and its blurred rim.
//! - Merges windows per spectrum and flags spectra whose windows changed
//!   since the previous call.
//!
//! Pointed observations (`SINGLE-POINT`, `MULTI-POINT`) skip the spatial
//! analysis and keep every detected range.
//!
//! Modules
//! - [`params`]: configuration of every stage.
//! - [`pattern`]: observing-pattern dispatch.
//! - `pipeline`: the [`LineValidator`] implementation.

pub mod params;
pub mod pattern;
mod pipeline;

pub use params::ValidationParams;
pub use pattern::ObservingPattern;
pub use pipeline::LineValidator;
