// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use crate::c64;

#[test]
fn time_key_display_is_fixed_point() {
    assert_eq!(TimeKey::from_micros(2_455_001_123_456).to_string(), "2455001.123456");
    assert_eq!(TimeKey::from_micros(0).to_string(), "0.000000");
    assert_eq!(TimeKey::from_micros(1).to_string(), "0.000001");
    assert_eq!(TimeKey::from_micros(5_000_000).to_string(), "5.000000");
}

#[test]
fn or_flags_accumulates() {
    let t = TimeKey::from_micros(1_000_000);
    let mut mask = Mask::new(4);
    mask.or_flags(t, &[true, false, false, false]);
    mask.or_flags(t, &[false, false, true, false]);
    assert_eq!(mask.row(t).unwrap(), &[true, false, true, false]);
    // A second record for the same timestamp must never clear flags.
    mask.or_flags(t, &[false, false, false, false]);
    assert_eq!(mask.row(t).unwrap(), &[true, false, true, false]);
}

#[test]
fn flag_channels_hits_every_row() {
    let mut mask = Mask::new(3);
    for i in 0..4 {
        mask.or_flags(TimeKey::from_micros(i), &[false; 3]);
    }
    mask.flag_channels(&[1]);
    for t in 0..4 {
        assert_eq!(mask.row(TimeKey::from_micros(t)).unwrap(), &[false, true, false]);
    }
}

#[test]
fn channel_occupancy_counts_fractions() {
    let mut mask = Mask::new(2);
    mask.or_flags(TimeKey::from_micros(0), &[true, false]);
    mask.or_flags(TimeKey::from_micros(1), &[true, false]);
    mask.or_flags(TimeKey::from_micros(2), &[false, false]);
    mask.or_flags(TimeKey::from_micros(3), &[true, false]);
    let occ = mask.channel_occupancy();
    approx::assert_abs_diff_eq!(occ[0], 0.75);
    approx::assert_abs_diff_eq!(occ[1], 0.0);
}

#[test]
fn apply_zeroes_masked_channels_and_replaces_flags() {
    let t = TimeKey::from_micros(42);
    let mut mask = Mask::new(3);
    mask.or_flags(t, &[false, true, false]);

    let data = vec![c64::new(1.0, 2.0), c64::new(3.0, 4.0), c64::new(5.0, 6.0)];
    let (new_data, new_flags) = mask.apply(t, &data).unwrap();
    assert_eq!(new_data[0], c64::new(1.0, 2.0));
    assert_eq!(new_data[1], c64::new(0.0, 0.0));
    assert_eq!(new_data[2], c64::new(5.0, 6.0));
    assert_eq!(new_flags, vec![false, true, false]);
}

#[test]
fn apply_rejects_uncovered_timestamp() {
    let mask = Mask::new(3);
    let result = mask.apply(TimeKey::from_micros(1), &[c64::new(1.0, 0.0); 3]);
    assert!(matches!(
        result,
        Err(MaskApplyError::TimestampNotCovered { .. })
    ));
}

#[test]
fn store_round_trip() {
    let mut mask = Mask::new(4);
    mask.or_flags(TimeKey::from_micros(1_000_000), &[true, false, false, true]);
    mask.or_flags(TimeKey::from_micros(2_000_000), &[false, false, true, false]);
    mask.or_flags(TimeKey::from_micros(3_000_000), &[false; 4]);

    let dir = tempfile::tempdir().unwrap();
    let path = store::mask_path(dir.path(), TimeKey::from_micros(1_000_000));
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "1.000000.xrfi");

    store::write(&mask, &path).unwrap();
    let read_back = store::read(&path).unwrap();
    assert_eq!(read_back, mask);
}

#[test]
fn load_missing_mask_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = store::mask_path(dir.path(), TimeKey::from_micros(999));
    let result = store::read(&path);
    assert!(matches!(result, Err(MaskReadError::NotFound(_))));
}
