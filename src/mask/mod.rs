// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The shared per-timestamp, per-channel RFI mask, and its persistence.

mod error;
pub(crate) mod store;
#[cfg(test)]
mod tests;

pub use error::{MaskApplyError, MaskReadError, MaskWriteError};

use std::collections::BTreeMap;

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::c64;

/// A timestamp with exact equality and ordering, used to key masks and
/// per-baseline data. Visibility timestamps look like floats on the wire, but
/// float keys make dictionary lookups a lottery; everything in this crate
/// works in integer microseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimeKey(i64);

impl TimeKey {
    pub fn from_micros(micros: i64) -> TimeKey {
        TimeKey(micros)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1e6
    }
}

impl std::fmt::Display for TimeKey {
    /// Fixed-point seconds with six decimal places. This rendering names mask
    /// files, so it must be stable and unambiguous; it must never go through
    /// floating point.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0.div_euclid(1_000_000);
        let frac = self.0.rem_euclid(1_000_000);
        write!(f, "{secs}.{frac:06}")
    }
}

/// Per-timestamp, per-channel boolean RFI decisions, shared across all
/// baselines and polarisations of a dataset. Rows are built by
/// OR-accumulation; a cell, once flagged, is never unflagged.
///
/// Invariant: every row has exactly `num_chans` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    num_chans: usize,
    rows: BTreeMap<TimeKey, Vec<bool>>,
}

impl Mask {
    pub fn new(num_chans: usize) -> Mask {
        Mask {
            num_chans,
            rows: BTreeMap::new(),
        }
    }

    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    pub fn num_times(&self) -> usize {
        self.rows.len()
    }

    pub fn times(&self) -> impl Iterator<Item = TimeKey> + '_ {
        self.rows.keys().copied()
    }

    pub fn row(&self, t: TimeKey) -> Option<&[bool]> {
        self.rows.get(&t).map(|r| r.as_slice())
    }

    /// OR a flag vector into the row for `t`, creating the row if this is the
    /// first record seen for that timestamp.
    pub fn or_flags(&mut self, t: TimeKey, flags: &[bool]) {
        debug_assert_eq!(flags.len(), self.num_chans);
        let row = self.rows.entry(t).or_insert_with(|| vec![false; flags.len()]);
        for (cell, &f) in row.iter_mut().zip(flags.iter()) {
            *cell |= f;
        }
    }

    /// Flag every channel at `t`. Does nothing for an unknown timestamp.
    pub fn flag_all(&mut self, t: TimeKey) {
        if let Some(row) = self.rows.get_mut(&t) {
            row.fill(true);
        }
    }

    /// Flag the given channels at every timestamp (manual flagging).
    pub fn flag_channels<'a, I: IntoIterator<Item = &'a usize> + Copy>(&mut self, chans: I) {
        for row in self.rows.values_mut() {
            for &c in chans {
                if c < row.len() {
                    row[c] = true;
                }
            }
        }
    }

    /// The fraction of timestamps in which each channel is flagged.
    pub fn channel_occupancy(&self) -> Vec<f64> {
        let mut counts = vec![0usize; self.num_chans];
        for row in self.rows.values() {
            for (count, &cell) in counts.iter_mut().zip(row.iter()) {
                *count += usize::from(cell);
            }
        }
        let num_times = self.rows.len().max(1) as f64;
        counts.into_iter().map(|c| c as f64 / num_times).collect()
    }

    /// Apply this mask to one record: masked channels are zeroed and the flag
    /// vector is replaced wholesale by the mask's row. The mask's time domain
    /// must cover the dataset; an uncovered timestamp is an error.
    pub fn apply(&self, t: TimeKey, data: &[c64]) -> Result<(Vec<c64>, Vec<bool>), MaskApplyError> {
        let row = self
            .rows
            .get(&t)
            .ok_or(MaskApplyError::TimestampNotCovered { t })?;
        let new_data = data
            .iter()
            .zip(row.iter())
            .map(|(&d, &m)| if m { c64::zero() } else { d })
            .collect();
        Ok((new_data, row.clone()))
    }
}
