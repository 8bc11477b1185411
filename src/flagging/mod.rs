// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! RFI detection: the crosstalk pre-filter, the two statistical detectors,
//! and the logic that merges their verdicts into one mask per dataset.

pub(crate) mod autopower;
pub(crate) mod crosstalk;
mod error;
pub(crate) mod merge;
pub(crate) mod outliers;
#[cfg(test)]
mod tests;

pub use error::FlagError;

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};
use strum_macros::{Display, EnumIter, EnumString};

use crate::c64;
use crate::mask::{Mask, TimeKey};
use crate::vis_io::{Baseline, VisReader};

/// Which detectors run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum FlagMode {
    /// Value-outlier detection on cross-correlations only.
    #[strum(serialize = "val")]
    Val,

    /// Integration-anomaly detection on autocorrelations only.
    #[strum(serialize = "int")]
    Int,

    /// Both detectors (the default).
    #[strum(serialize = "both")]
    Both,

    /// Neither; only pre-existing and manually-specified flags survive.
    #[strum(serialize = "none")]
    None,
}

impl FlagMode {
    fn flags_values(self) -> bool {
        matches!(self, FlagMode::Val | FlagMode::Both)
    }

    fn flags_integrations(self) -> bool {
        matches!(self, FlagMode::Int | FlagMode::Both)
    }
}

/// Everything that parameterises a detection pass.
#[derive(Debug, Clone)]
pub struct FlagParams {
    /// Standard deviations above the mean for the value-outlier detector.
    pub nsig: f64,

    pub mode: FlagMode,

    /// Fraction of timestamps above which a channel is flagged outright.
    pub ch_thresh: f64,

    /// Fraction of channels above which a timestamp is flagged outright.
    pub int_thresh: f64,

    /// Channels to flag unconditionally, at every timestamp.
    pub manual_chans: HashSet<usize>,
}

impl Default for FlagParams {
    fn default() -> FlagParams {
        FlagParams {
            nsig: 2.0,
            mode: FlagMode::Both,
            ch_thresh: 0.33,
            int_thresh: 0.99,
            manual_chans: HashSet::new(),
        }
    }
}

/// time -> filtered sample vector, for one (polarisation, baseline).
type BaselineData = BTreeMap<TimeKey, Vec<c64>>;

/// One dataset's visibilities, grouped the way the detectors want them, plus
/// the working mask seeded from the records' own flags. Detection needs the
/// full time series in memory; there is no streaming variant.
struct GatheredVis {
    /// polarisation -> baseline -> time -> sample. Cross-correlations are
    /// already crosstalk-filtered; autocorrelations are untouched.
    data: BTreeMap<i32, BTreeMap<Baseline, BaselineData>>,
    mask: Mask,
}

fn gather(reader: &mut VisReader) -> Result<GatheredVis, FlagError> {
    let num_chans = reader.num_chans();
    // Built on first use; the channel count is fixed for the dataset, so one
    // window and one FFT plan serve every cross-correlation sample.
    let mut filter: Option<crosstalk::CrosstalkFilter> = None;
    let mut data: BTreeMap<i32, BTreeMap<Baseline, BaselineData>> = BTreeMap::new();
    let mut mask = Mask::new(num_chans);
    let mut num_records = 0usize;

    reader.rewind()?;
    while let Some(record) = reader.read_record()? {
        num_records += 1;
        mask.or_flags(record.time, &record.flags);
        let d = if record.baseline.is_auto() || num_chans == 0 {
            record.data
        } else {
            filter
                .get_or_insert_with(|| crosstalk::CrosstalkFilter::new(num_chans))
                .apply(&record.data)
        };
        data.entry(record.pol)
            .or_default()
            .entry(record.baseline)
            .or_default()
            .insert(record.time, d);
    }

    debug!(
        "Gathered {num_records} records over {} timestamps",
        mask.num_times()
    );
    Ok(GatheredVis { data, mask })
}

/// Run a full detection pass over the dataset and produce its mask. The
/// dataset is read from the start (the reader is rewound first) and the
/// reader is left at end-of-data.
pub fn detect(reader: &mut VisReader, params: &FlagParams) -> Result<Mask, FlagError> {
    let GatheredVis { data, mut mask } = gather(reader)?;

    if !params.manual_chans.is_empty() {
        info!("Manually flagging {} channels", params.manual_chans.len());
        mask.flag_channels(&params.manual_chans);
    }

    if params.mode.flags_values() {
        // Per-baseline statistics all use the mask as it stood before any
        // value detections, so baselines don't see each other's flags; the
        // detections land in a fresh accumulator that replaces the working
        // mask afterwards.
        let snapshot = mask.clone();
        let mut accumulator = mask;
        for (pol, baselines) in &data {
            for (baseline, baseline_data) in baselines {
                if baseline.is_auto() {
                    continue;
                }
                let detections = outliers::detect_value_outliers(baseline_data, &snapshot, params.nsig);
                let num_flagged: usize = detections
                    .values()
                    .map(|row| row.iter().filter(|&&b| b).count())
                    .sum();
                if num_flagged > 0 {
                    debug!("Baseline {baseline} pol {pol}: {num_flagged} outlier cells");
                }
                for (t, row) in detections {
                    accumulator.or_flags(t, &row);
                }
            }
        }
        mask = accumulator;

        merge::escalate(&mut mask, params.ch_thresh, params.int_thresh);
    }

    if params.mode.flags_integrations() {
        // One vote per distinct antenna, however many polarisations agreed.
        let mut votes: BTreeMap<TimeKey, HashSet<u32>> = BTreeMap::new();
        for baselines in data.values() {
            for (baseline, baseline_data) in baselines {
                if !baseline.is_auto() {
                    continue;
                }
                for t in autopower::detect_power_anomalies(baseline_data, &mask) {
                    votes.entry(t).or_default().insert(baseline.ant1);
                }
            }
        }
        merge::apply_power_votes(&mut mask, &votes);
    }

    Ok(mask)
}
