// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The integration-anomaly detector.
//!
//! Works on one antenna's autocorrelations: integrate the unmasked power per
//! timestamp, subtract a smoothed version of the power series, and call a
//! timestamp anomalous when its residual is strictly above the residual
//! standard deviation. The caller collects anomalies per antenna; a timestamp
//! only makes it into the shared mask when at least two antennas agree, which
//! keeps a single noisy receiver from flagging the whole array.

use std::collections::BTreeMap;

use crate::c64;
use crate::mask::{Mask, TimeKey};

/// Half-width of the centred moving average used to smooth the power series.
const SMOOTH_HALF_WIDTH: usize = 4;

/// Timestamps whose integrated power is anomalous for this antenna, in
/// ascending time order. Fully-masked timestamps carry no vote, and
/// degenerate statistics (fewer than two usable timestamps, or zero residual
/// spread) yield no votes at all.
pub(crate) fn detect_power_anomalies(
    data: &BTreeMap<TimeKey, Vec<c64>>,
    working: &Mask,
) -> Vec<TimeKey> {
    let times: Vec<TimeKey> = data.keys().copied().collect();

    // Mean unmasked magnitude per timestamp; None when everything at that
    // timestamp is already masked.
    let powers: Vec<Option<f64>> = times
        .iter()
        .map(|t| {
            let d = &data[t];
            let row = working.row(*t);
            let mut sum = 0.0;
            let mut n = 0usize;
            for (j, v) in d.iter().enumerate() {
                if row.map_or(false, |r| r[j]) {
                    continue;
                }
                sum += v.norm();
                n += 1;
            }
            (n > 0).then(|| sum / n as f64)
        })
        .collect();

    let smoothed = moving_average(&powers, SMOOTH_HALF_WIDTH);
    let residuals: Vec<Option<f64>> = powers
        .iter()
        .zip(smoothed.iter())
        .map(|(&p, &s)| p.zip(s).map(|(p, s)| (p - s).abs()))
        .collect();

    let valid: Vec<f64> = residuals.iter().flatten().copied().collect();
    if valid.len() < 2 {
        return vec![];
    }
    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    let sig = (valid.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>()
        / valid.len() as f64)
        .sqrt();
    if !(sig > 0.0) || !sig.is_finite() {
        return vec![];
    }

    times
        .iter()
        .zip(residuals.iter())
        .filter_map(|(&t, r)| match r {
            Some(r) if *r > sig => Some(t),
            _ => None,
        })
        .collect()
}

/// Centred, edge-truncated moving average that skips `None` entries. An entry
/// that is itself `None` stays `None`.
fn moving_average(values: &[Option<f64>], half_width: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            values[i]?;
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width + 1).min(values.len());
            let window: Vec<f64> = values[lo..hi].iter().flatten().copied().collect();
            Some(window.iter().sum::<f64>() / window.len() as f64)
        })
        .collect()
}
