use crate::types::ChannelRange;

/// Collapse protect windows into the minimal sorted list of disjoint ranges
/// covering the same channels.
///
/// Windows are inclusive; overlapping and adjacent windows are joined.
/// Sentinel entries are ignored, and an input with nothing left yields
/// `[[-1, -1]]`. A single window is returned unchanged.
pub fn merge_windows(windows: &[ChannelRange]) -> Vec<ChannelRange> {
    let mut ranges: Vec<ChannelRange> = windows
        .iter()
        .filter(|w| !w.is_sentinel())
        .map(|w| ChannelRange::new(w.start.min(w.end), w.start.max(w.end)))
        .collect();
    match ranges.len() {
        0 => return vec![ChannelRange::NONE],
        1 => return ranges,
        _ => {}
    }
    ranges.sort_unstable();

    let mut merged: Vec<ChannelRange> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(cur) if r.start <= cur.end.saturating_add(1) => {
                cur.end = cur.end.max(r.end);
            }
            _ => merged.push(r),
        }
    }
    merged
}
