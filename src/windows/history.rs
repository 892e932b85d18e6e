use crate::types::{ChannelRange, SpectrumId, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last known windows of one spectrum.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskRecord {
    pub windows: Vec<ChannelRange>,
    /// Iteration since which `windows` has not changed, if it has settled.
    pub unchanged_since: Option<u32>,
}

/// Caller-owned window history across pipeline iterations.
///
/// The engine itself is stateless; this record lets a caller detect which
/// spectra need no refit on the next baseline pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MaskHistory {
    records: BTreeMap<SpectrumId, MaskRecord>,
}

impl MaskHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously stored windows for the given spectrum.
    pub fn windows(&self, id: SpectrumId) -> Option<&[ChannelRange]> {
        self.records.get(&id).map(|r| r.windows.as_slice())
    }

    pub fn record(&self, id: SpectrumId) -> Option<&MaskRecord> {
        self.records.get(&id)
    }

    /// Snapshot of the stored windows, suitable as the `previous` argument of
    /// the validator.
    pub fn previous(&self) -> BTreeMap<SpectrumId, Vec<ChannelRange>> {
        self.records
            .iter()
            .map(|(id, rec)| (*id, rec.windows.clone()))
            .collect()
    }

    /// Store new windows for one spectrum. Returns true when they changed.
    pub fn update(&mut self, iteration: u32, id: SpectrumId, windows: &[ChannelRange]) -> bool {
        let rec = self.records.entry(id).or_default();
        if windows_equal(&rec.windows, windows) {
            if rec.unchanged_since.is_none() {
                rec.unchanged_since = Some(iteration);
            }
            false
        } else {
            rec.windows = windows.to_vec();
            rec.unchanged_since = None;
            true
        }
    }

    /// Apply every spectrum of a validation result. Returns how many changed.
    pub fn apply(&mut self, iteration: u32, result: &ValidationResult) -> usize {
        let mut changed = 0;
        for (id, outcome) in &result.windows {
            if self.update(iteration, *id, &outcome.windows) {
                changed += 1;
            }
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Window lists compare equal when they cover the same channels; an empty
/// list and the lone sentinel both mean "no window".
pub(crate) fn windows_equal(a: &[ChannelRange], b: &[ChannelRange]) -> bool {
    normalized(a) == normalized(b)
}

fn normalized(w: &[ChannelRange]) -> &[ChannelRange] {
    if w.len() == 1 && w[0].is_sentinel() {
        &[]
    } else {
        w
    }
}
