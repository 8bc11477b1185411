// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use std::collections::{BTreeMap, HashSet};

use approx::assert_abs_diff_eq;

use crate::c64;
use crate::mask::{Mask, TimeKey};
use crate::vis_io::{VisRecord, VisWriter};

fn key(s: i64) -> TimeKey {
    TimeKey::from_micros(s * 1_000_000)
}

/// A 4-timestamp, 4-channel cross-correlation with unit magnitudes except for
/// one hot cell at (t2, ch3).
fn spiked_baseline() -> BTreeMap<TimeKey, Vec<c64>> {
    let mut data = BTreeMap::new();
    for t in 0..4 {
        let mut row = vec![c64::new(1.0, 0.0); 4];
        if t == 2 {
            row[3] = c64::new(100.0, 0.0);
        }
        data.insert(key(t), row);
    }
    data
}

#[test]
fn crosstalk_filter_annihilates_constant_signal() {
    // A frequency-constant sample is pure zero-delay, i.e. pure crosstalk.
    let filter = crosstalk::CrosstalkFilter::new(8);
    let sample = vec![c64::new(3.0, -1.5); 8];
    for v in filter.apply(&sample) {
        assert_abs_diff_eq!(v.norm(), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn crosstalk_filter_keeps_nonzero_delay_structure() {
    let filter = crosstalk::CrosstalkFilter::new(8);
    // A single hot channel has power at every delay; most of it survives.
    let mut sample = vec![c64::new(0.0, 0.0); 8];
    sample[3] = c64::new(10.0, 0.0);
    let filtered = filter.apply(&sample);
    assert_eq!(filtered.len(), 8);
    let total: f64 = filtered.iter().map(|v| v.norm()).sum();
    assert!(total > 1.0, "filtered power was {total}");
}

#[test]
fn outlier_thresholds_scale_with_nsig() {
    let mags = ndarray::arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let masked = ndarray::Array2::from_elem((2, 3), false);
    let (hi1, lo1) = outliers::outlier_thresholds(mags.view(), masked.view(), 1.0).unwrap();
    let (hi2, lo2) = outliers::outlier_thresholds(mags.view(), masked.view(), 2.0).unwrap();
    assert!(hi2 > hi1);
    assert!(lo2 < lo1);
    // mean of 1..=6 is 3.5.
    assert_abs_diff_eq!(hi1 + lo1, 7.0, epsilon = 1e-12);
}

#[test]
fn outlier_thresholds_empty_population_is_degenerate() {
    let mags = ndarray::arr2(&[[1.0, 2.0], [3.0, 4.0]]);
    let masked = ndarray::Array2::from_elem((2, 2), true);
    assert!(outliers::outlier_thresholds(mags.view(), masked.view(), 2.0).is_none());
}

#[test]
fn value_outliers_flag_only_the_spike() {
    let data = spiked_baseline();
    let working = Mask::new(4);
    let detections = outliers::detect_value_outliers(&data, &working, 2.0);
    for (t, row) in &detections {
        for (c, &flagged) in row.iter().enumerate() {
            let expected = *t == key(2) && c == 3;
            assert_eq!(flagged, expected, "unexpected flag state at ({t}, {c})");
        }
    }
}

#[test]
fn value_outliers_are_monotone_in_nsig() {
    // Mildly structured data: rising magnitudes with a couple of hot cells.
    let mut data = BTreeMap::new();
    for t in 0..8i64 {
        let row: Vec<c64> = (0..16)
            .map(|c| {
                let base = 1.0 + 0.1 * (t as f64) + 0.05 * (c as f64);
                let hot = if (t, c) == (3, 7) || (t, c) == (6, 2) { 8.0 } else { 0.0 };
                c64::new(base + hot, 0.0)
            })
            .collect();
        data.insert(key(t), row);
    }
    let working = Mask::new(16);

    let mut previous: Option<usize> = None;
    for nsig in [0.5, 1.0, 2.0, 3.0, 5.0] {
        let detections = outliers::detect_value_outliers(&data, &working, nsig);
        let flagged: usize = detections
            .values()
            .map(|row| row.iter().filter(|&&b| b).count())
            .sum();
        if let Some(p) = previous {
            assert!(
                flagged <= p,
                "nsig {nsig} flagged {flagged} cells, more than the looser threshold's {p}"
            );
        }
        previous = Some(flagged);
    }
}

#[test]
fn fully_masked_baseline_contributes_nothing() {
    let data = spiked_baseline();
    let mut working = Mask::new(4);
    for t in 0..4 {
        working.or_flags(key(t), &[true; 4]);
    }
    assert!(outliers::detect_value_outliers(&data, &working, 2.0).is_empty());
}

#[test]
fn spike_scenario_does_not_escalate() {
    // One hot cell in 4x4 data: channel 3 is flagged in 1/4 = 0.25 of
    // timestamps, under ch_thresh 0.33, so escalation must leave the mask
    // with exactly that one cell.
    let data = spiked_baseline();
    let mut mask = Mask::new(4);
    for t in 0..4 {
        mask.or_flags(key(t), &[false; 4]);
    }
    let snapshot = mask.clone();
    for (t, row) in outliers::detect_value_outliers(&data, &snapshot, 2.0) {
        mask.or_flags(t, &row);
    }
    merge::escalate(&mut mask, 0.33, 0.99);

    for t in 0..4 {
        for c in 0..4 {
            let expected = t == 2 && c == 3;
            assert_eq!(mask.row(key(t)).unwrap()[c], expected);
        }
    }
}

#[test]
fn channel_escalation_is_strictly_greater_than() {
    // Channel 0 flagged in 1 of 4 timestamps: fraction exactly 0.25.
    let build = || {
        let mut mask = Mask::new(2);
        mask.or_flags(key(0), &[true, false]);
        for t in 1..4 {
            mask.or_flags(key(t), &[false, false]);
        }
        mask
    };

    // Equality: no escalation.
    let mut mask = build();
    merge::escalate(&mut mask, 0.25, 0.99);
    assert_eq!(mask.row(key(1)).unwrap(), &[false, false]);

    // Strictly above the threshold: the channel goes everywhere.
    let mut mask = build();
    merge::escalate(&mut mask, 0.2, 0.99);
    for t in 0..4 {
        assert_eq!(mask.row(key(t)).unwrap(), &[true, false]);
    }
}

#[test]
fn integration_escalation_is_strictly_greater_than() {
    // 2 of 4 channels flagged at t0: fraction exactly 0.5.
    let build = || {
        let mut mask = Mask::new(4);
        mask.or_flags(key(0), &[true, true, false, false]);
        mask.or_flags(key(1), &[false; 4]);
        mask
    };

    let mut mask = build();
    merge::escalate(&mut mask, 0.99, 0.5);
    assert_eq!(mask.row(key(0)).unwrap(), &[true, true, false, false]);

    let mut mask = build();
    merge::escalate(&mut mask, 0.99, 0.49);
    assert_eq!(mask.row(key(0)).unwrap(), &[true; 4]);
}

#[test]
fn escalation_is_idempotent_on_escalated_masks() {
    // Every channel's occupancy is already 0 or 1.
    let mut mask = Mask::new(3);
    for t in 0..5 {
        mask.or_flags(key(t), &[true, false, true]);
    }
    merge::escalate(&mut mask, 0.33, 0.99);
    let once = mask.clone();
    merge::escalate(&mut mask, 0.33, 0.99);
    assert_eq!(mask, once);
}

#[test]
fn single_antenna_votes_are_suppressed() {
    let mut mask = Mask::new(2);
    for t in 0..3 {
        mask.or_flags(key(t), &[false, false]);
    }

    let mut votes: BTreeMap<TimeKey, HashSet<u32>> = BTreeMap::new();
    votes.entry(key(1)).or_default().insert(0);

    merge::apply_power_votes(&mut mask, &votes);
    assert_eq!(mask.row(key(1)).unwrap(), &[false, false]);

    votes.entry(key(1)).or_default().insert(3);
    merge::apply_power_votes(&mut mask, &votes);
    assert_eq!(mask.row(key(1)).unwrap(), &[true, true]);
}

#[test]
fn power_anomaly_detector_finds_the_hot_integration() {
    let mut data = BTreeMap::new();
    for t in 0..11i64 {
        let power = if t == 5 { 10.0 } else { 1.0 };
        data.insert(key(t), vec![c64::new(power, 0.0); 4]);
    }
    let working = Mask::new(4);
    let anomalies = autopower::detect_power_anomalies(&data, &working);
    assert_eq!(anomalies, vec![key(5)]);
}

#[test]
fn power_anomaly_detector_is_vacuous_on_flat_data() {
    let mut data = BTreeMap::new();
    for t in 0..11i64 {
        data.insert(key(t), vec![c64::new(1.0, 0.0); 4]);
    }
    let working = Mask::new(4);
    assert!(autopower::detect_power_anomalies(&data, &working).is_empty());
}

/// Write a little dataset of autocorrelations for `num_ants` antennas, with a
/// power spike at t5 on the first `num_spiking` antennas.
fn write_auto_dataset(path: &std::path::Path, num_ants: u32, num_spiking: u32) {
    let mut writer = VisWriter::create(path, 4, "simulated\n").unwrap();
    for t in 0..11i64 {
        for ant in 0..num_ants {
            let power = if t == 5 && ant < num_spiking { 10.0 } else { 1.0 };
            writer
                .write_record(&VisRecord {
                    time: key(t),
                    baseline: crate::vis_io::Baseline::new(ant, ant),
                    pol: -5,
                    data: vec![c64::new(power, 0.0); 4],
                    flags: vec![false; 4],
                })
                .unwrap();
        }
    }
    writer.finish().unwrap();
}

#[test]
fn detect_masks_integration_when_three_antennas_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autos.uv");
    write_auto_dataset(&path, 3, 3);

    let mut reader = crate::vis_io::VisReader::open(&path).unwrap();
    let params = FlagParams {
        mode: FlagMode::Int,
        ..Default::default()
    };
    let mask = detect(&mut reader, &params).unwrap();

    for t in 0..11 {
        let expected = t == 5;
        assert!(
            mask.row(key(t)).unwrap().iter().all(|&b| b == expected),
            "wrong mask at timestamp {t}"
        );
    }
}

#[test]
fn detect_ignores_a_lone_anomalous_antenna() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autos.uv");
    write_auto_dataset(&path, 3, 1);

    let mut reader = crate::vis_io::VisReader::open(&path).unwrap();
    let params = FlagParams {
        mode: FlagMode::Int,
        ..Default::default()
    };
    let mask = detect(&mut reader, &params).unwrap();
    assert!(mask.times().all(|t| mask.row(t).unwrap().iter().all(|&b| !b)));
}

#[test]
fn mode_none_keeps_only_existing_and_manual_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.uv");
    let mut writer = VisWriter::create(&path, 4, "").unwrap();
    for t in 0..3i64 {
        writer
            .write_record(&VisRecord {
                time: key(t),
                baseline: crate::vis_io::Baseline::new(0, 1),
                pol: -5,
                // Big outlier which mode "none" must not act on.
                data: vec![c64::new(if t == 1 { 500.0 } else { 1.0 }, 0.0); 4],
                flags: vec![t == 0, false, false, false],
            })
            .unwrap();
    }
    writer.finish().unwrap();

    let mut reader = crate::vis_io::VisReader::open(&path).unwrap();
    let params = FlagParams {
        mode: FlagMode::None,
        manual_chans: [2usize].into_iter().collect(),
        ..Default::default()
    };
    let mask = detect(&mut reader, &params).unwrap();

    assert_eq!(mask.row(key(0)).unwrap(), &[true, false, true, false]);
    assert_eq!(mask.row(key(1)).unwrap(), &[false, false, true, false]);
    assert_eq!(mask.row(key(2)).unwrap(), &[false, false, true, false]);
}

#[test]
fn flag_mode_parses_from_strings() {
    use std::str::FromStr;
    assert_eq!(FlagMode::from_str("val").unwrap(), FlagMode::Val);
    assert_eq!(FlagMode::from_str("int").unwrap(), FlagMode::Int);
    assert_eq!(FlagMode::from_str("both").unwrap(), FlagMode::Both);
    assert_eq!(FlagMode::from_str("none").unwrap(), FlagMode::None);
    assert!(FlagMode::from_str("sideways").is_err());
}
