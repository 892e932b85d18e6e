//! Protect windows: synthesis from validated clusters, merging, and
//! cross-iteration change tracking.

pub mod history;
pub mod merge;
pub mod synth;

pub use history::{MaskHistory, MaskRecord};
pub use merge::merge_windows;
pub use synth::{
    protect_window, synthesize_windows, SynthesisInput, SynthesisOutput, SynthesisParams,
};
