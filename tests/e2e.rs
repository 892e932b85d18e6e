mod common;

use common::synthetic_raster::{raster, raster_id};
use line_validator::types::ValidationInput;
use line_validator::{ChannelRange, LineValidator, MaskHistory, ObservingPattern, ValidationParams};
use std::collections::BTreeMap;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn r(start: i64, end: i64) -> ChannelRange {
    ChannelRange::new(start, end)
}

#[test]
fn uniform_raster_line_is_protected_everywhere() {
    init_logger();
    let input = ValidationInput::raster(1024, raster(3, 3, |_, _| vec![r(100, 120)]));
    let validator = LineValidator::new(ValidationParams::default());
    let out = validator.process_with_diagnostics(&input, &BTreeMap::new());

    assert_eq!(out.result.windows.len(), 9);
    for (id, outcome) in &out.result.windows {
        assert_eq!(outcome.windows, vec![r(85, 135)], "spectrum {id}");
        assert!(outcome.changed, "spectrum {id} should report a change");
    }
    assert_eq!(out.result.clusters.len(), 1);
    assert!(out.result.clusters[0].valid);

    let synthesis = out.report.synthesis.as_ref().expect("raster run reports synthesis");
    assert_eq!(synthesis.blobs.len(), 1);
    assert_eq!(synthesis.sentinel_spectra, 0);
    assert!(out.report.cluster_flags.is_some());
}

#[test]
fn hole_in_the_map_is_filled_from_neighbours() {
    init_logger();
    let spectra = raster(3, 3, |x, y| {
        if (x, y) == (1, 1) {
            Vec::new()
        } else {
            vec![r(100, 120)]
        }
    });
    let input = ValidationInput::raster(1024, spectra);
    let res = LineValidator::new(ValidationParams::default()).process(&input, &BTreeMap::new());

    let center = raster_id(1, 1, 3);
    assert_eq!(res.windows_for(center).unwrap(), &[r(85, 135)]);
    for (id, outcome) in &res.windows {
        assert_eq!(outcome.windows, vec![r(85, 135)], "spectrum {id}");
    }
}

/// Two line-emitting blocks of three columns each, `gap` empty columns apart.
fn two_blocks(gap: usize) -> (usize, ValidationInput) {
    let nx = 6 + gap;
    let spectra = raster(nx, 3, |x, _| {
        if x < 3 {
            vec![r(100, 120)]
        } else if x >= 3 + gap {
            vec![r(400, 440)]
        } else {
            Vec::new()
        }
    });
    (nx, ValidationInput::raster(1024, spectra))
}

#[test]
fn distant_regions_keep_their_own_lines() {
    init_logger();
    // Five empty columns exceed the smoothing reach plus the blur radius.
    let (nx, input) = two_blocks(5);
    let out = LineValidator::new(ValidationParams::default())
        .process_with_diagnostics(&input, &BTreeMap::new());
    let res = &out.result;

    assert_eq!(res.clusters.len(), 2);
    assert!(res.clusters.iter().all(|c| c.valid));
    assert!(res.clusters[0].center < res.clusters[1].center);

    for y in 0..3 {
        for x in 0..3 {
            assert_eq!(
                res.windows_for(raster_id(x, y, nx)).unwrap(),
                &[r(85, 135)],
                "left block ({x}, {y})"
            );
        }
        for x in nx - 3..nx {
            assert_eq!(
                res.windows_for(raster_id(x, y, nx)).unwrap(),
                &[r(375, 465)],
                "right block ({x}, {y})"
            );
        }
    }
}

#[test]
fn close_regions_share_windows_on_facing_columns() {
    init_logger();
    let (nx, input) = two_blocks(1);
    let res = LineValidator::new(ValidationParams::default()).process(&input, &BTreeMap::new());

    assert_eq!(res.clusters.len(), 2);
    for y in 0..3 {
        assert_eq!(res.windows_for(raster_id(0, y, nx)).unwrap(), &[r(85, 135)]);
        assert_eq!(res.windows_for(raster_id(6, y, nx)).unwrap(), &[r(375, 465)]);
    }
    // One empty column is within the rim of both blocks.
    for x in [2, 4] {
        assert_eq!(
            res.windows_for(raster_id(x, 1, nx)).unwrap(),
            &[r(85, 135), r(375, 465)],
            "facing column {x}"
        );
    }
}

#[test]
fn repeated_detections_in_one_spectrum_use_their_overlap() {
    init_logger();
    let input = ValidationInput::raster(1024, raster(3, 3, |_, _| vec![r(100, 120), r(104, 124)]));
    let res = LineValidator::new(ValidationParams::default()).process(&input, &BTreeMap::new());

    assert_eq!(res.clusters.len(), 1);
    for (id, outcome) in &res.windows {
        assert_eq!(outcome.windows, vec![r(91, 133)], "spectrum {id}");
    }
}

#[test]
fn raster_without_candidates_yields_sentinels() {
    init_logger();
    let input = ValidationInput::raster(512, raster(4, 4, |_, _| Vec::new()));
    let res = LineValidator::new(ValidationParams::default()).process(&input, &BTreeMap::new());
    assert_eq!(res.windows.len(), 16);
    assert!(res.clusters.is_empty());
    for outcome in res.windows.values() {
        assert_eq!(outcome.windows, vec![ChannelRange::NONE]);
        assert!(!outcome.changed);
    }
}

#[test]
fn windows_stay_inside_the_band() {
    init_logger();
    let nchan = 256usize;
    let spectra = raster(5, 5, |x, y| {
        if (x + y) % 2 == 0 {
            vec![r(0, 12), r(240, 255)]
        } else {
            vec![r(2, 14), r(238, 253)]
        }
    });
    let input = ValidationInput::raster(nchan, spectra);
    let res = LineValidator::new(ValidationParams::default()).process(&input, &BTreeMap::new());

    let last = nchan as i64 - 1;
    for (id, outcome) in &res.windows {
        assert!(!outcome.windows.is_empty(), "spectrum {id} has no window list");
        for w in &outcome.windows {
            if w.is_sentinel() {
                continue;
            }
            assert!(
                0 <= w.start && w.start <= w.end && w.end <= last,
                "spectrum {id} window {w} outside [0, {last}]"
            );
        }
        for pair in outcome.windows.windows(2) {
            assert!(pair[0].end < pair[1].start, "spectrum {id} windows overlap");
        }
    }
}

#[test]
fn single_point_observation_keeps_detected_ranges() {
    init_logger();
    let spectra = raster(2, 1, |x, _| {
        if x == 0 {
            vec![r(10, 20), r(18, 40)]
        } else {
            vec![r(500, 600)]
        }
    });
    let input = ValidationInput {
        pattern: ObservingPattern::SinglePoint,
        ..ValidationInput::raster(550, spectra)
    };
    let out = LineValidator::new(ValidationParams::default())
        .process_with_diagnostics(&input, &BTreeMap::new());

    assert_eq!(out.result.windows_for(0).unwrap(), &[r(10, 40)]);
    assert_eq!(out.result.windows_for(1).unwrap(), &[r(500, 549)]);
    assert!(out.report.clustering.is_none());
    assert!(out.report.grid.is_none());
}

#[test]
fn mask_history_settles_on_repeated_input() {
    init_logger();
    let mut input = ValidationInput::raster(1024, raster(3, 3, |_, _| vec![r(100, 120)]));
    let validator = LineValidator::new(ValidationParams::default());
    let mut history = MaskHistory::new();

    let first = validator.process(&input, &history.previous());
    assert_eq!(history.apply(input.iteration, &first), 9);
    assert!(first.windows.values().all(|o| o.changed));

    input.iteration = 1;
    let second = validator.process(&input, &history.previous());
    assert_eq!(history.apply(input.iteration, &second), 0);
    assert!(second.windows.values().all(|o| !o.changed));
    assert_eq!(history.record(0).unwrap().unchanged_since, Some(1));
    assert_eq!(history.windows(4).unwrap(), &[r(85, 135)]);
}
