//! Diagnostics data model returned by the validator.
//!
//! `ValidationReport` is the entry point: it bundles the input description,
//! per-stage timings and one report per pipeline stage (clustering, grid
//! statistics, window synthesis) plus the per-cell cluster flag map.

pub mod clustering;
pub mod flags;
pub mod grid;
pub mod pipeline;
pub mod synthesis;
pub mod timing;

pub use clustering::ClusteringStage;
pub use flags::{ClusterFlagMap, FlagStage, StageThresholds};
pub use grid::GridStage;
pub use pipeline::{InputDescriptor, ValidationReport};
pub use synthesis::{BlobReport, SynthesisStage};
pub use timing::{StageTiming, TimingBreakdown};
