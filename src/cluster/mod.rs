//! Unsupervised grouping of line candidates in (width, center) space.
//!
//! - [`kmeans`]: seeded Lloyd k-means with random restarts.
//! - [`selection`]: model-order search with sigma clipping and a
//!   complexity-penalised score that decides how many distinct spectral
//!   features the candidates represent.

pub(crate) mod kmeans;
pub mod selection;

pub use selection::{select_clusters, Cluster, ClusterSelection, ScoreSample, SelectionParams};
