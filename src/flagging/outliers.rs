// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The value-outlier detector.
//!
//! Operates on one cross-correlation baseline at a time: build the
//! (time x channel) magnitude matrix, compute mean and standard deviation of
//! the cells not already masked, and flag every cell whose magnitude is
//! strictly above mean + nsig * std. Each baseline's statistics are its own;
//! the caller ORs the per-baseline results into the shared mask.

use std::collections::BTreeMap;

use ndarray::prelude::*;

use crate::c64;
use crate::mask::{Mask, TimeKey};

/// High and low thresholds for the unmasked population of `mags`, or `None`
/// when the statistics are degenerate (nothing unmasked, or non-finite
/// spread). Only the high threshold flags anything, but both are derived.
pub(crate) fn outlier_thresholds(
    mags: ArrayView2<f64>,
    masked: ArrayView2<bool>,
    nsig: f64,
) -> Option<(f64, f64)> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (&m, &is_masked) in mags.iter().zip(masked.iter()) {
        if !is_masked {
            sum += m;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;

    let mut var_sum = 0.0;
    for (&m, &is_masked) in mags.iter().zip(masked.iter()) {
        if !is_masked {
            var_sum += (m - mean) * (m - mean);
        }
    }
    let std = (var_sum / count as f64).sqrt();
    if !std.is_finite() || !mean.is_finite() {
        return None;
    }
    Some((mean + nsig * std, mean - nsig * std))
}

/// Detect outlying cells for one baseline. `working` supplies the cells to
/// exclude from the statistics; the returned per-timestamp rows contain only
/// this baseline's detections and are for the caller to OR into the shared
/// mask. Degenerate statistics yield no detections.
pub(crate) fn detect_value_outliers(
    data: &BTreeMap<TimeKey, Vec<c64>>,
    working: &Mask,
    nsig: f64,
) -> BTreeMap<TimeKey, Vec<bool>> {
    let num_times = data.len();
    let num_chans = match data.values().next() {
        Some(d) => d.len(),
        None => return BTreeMap::new(),
    };

    let mut mags = Array2::<f64>::zeros((num_times, num_chans));
    let mut masked = Array2::<bool>::from_elem((num_times, num_chans), false);
    for (i, (t, d)) in data.iter().enumerate() {
        for (j, v) in d.iter().enumerate() {
            mags[(i, j)] = v.norm();
        }
        if let Some(row) = working.row(*t) {
            for (j, &m) in row.iter().enumerate() {
                masked[(i, j)] = m;
            }
        }
    }

    let (hi, _lo) = match outlier_thresholds(mags.view(), masked.view(), nsig) {
        Some(thresholds) => thresholds,
        None => return BTreeMap::new(),
    };

    data.keys()
        .enumerate()
        .map(|(i, &t)| (t, mags.row(i).iter().map(|&m| m > hi).collect()))
        .collect()
}
