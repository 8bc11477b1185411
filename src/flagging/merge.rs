// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mask escalation and vote merging.
//!
//! Escalation turns a locally-correct mask into an operationally useful one:
//! a channel flagged in a third of all timestamps is better discarded
//! outright than kept piecewise, and a timestamp with essentially every
//! channel flagged might as well lose the stragglers too.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::mask::{Mask, TimeKey};

/// How many distinct antennas must call a timestamp anomalous before the
/// integration-anomaly detector's verdict is believed.
pub(crate) const MIN_AGREEING_ANTENNAS: usize = 2;

/// Escalate the mask by channel and integration occupancy.
///
/// A channel flagged in strictly more than `ch_thresh` of all timestamps is
/// flagged everywhere. A timestamp with strictly more than `int_thresh` of
/// its channels flagged is flagged wholesale; otherwise the channel
/// escalation vector is OR-ed in. The channel statistics are computed once,
/// up front, so a timestamp's integration decision short-circuits the channel
/// OR for that timestamp only. Both comparisons are strict: sitting exactly
/// on a threshold does not escalate.
///
/// Running this twice on a mask whose channel occupancies are all 0 or 1 is a
/// no-op.
pub(crate) fn escalate(mask: &mut Mask, ch_thresh: f64, int_thresh: f64) {
    let num_chans = mask.num_chans();
    if num_chans == 0 || mask.num_times() == 0 {
        return;
    }

    let ch_msk: Vec<bool> = mask
        .channel_occupancy()
        .into_iter()
        .map(|f| f > ch_thresh)
        .collect();
    let num_escalated = ch_msk.iter().filter(|&&b| b).count();
    if num_escalated > 0 {
        debug!("Channel escalation discards {num_escalated} channels entirely");
    }

    let decisions: Vec<(TimeKey, bool)> = mask
        .times()
        .map(|t| {
            let num_flagged = mask
                .row(t)
                .map(|row| row.iter().filter(|&&b| b).count())
                .unwrap_or(0);
            (t, num_flagged as f64 > int_thresh * num_chans as f64)
        })
        .collect();

    for (t, whole_integration) in decisions {
        if whole_integration {
            debug!("Integration escalation flags all of timestamp {t}");
            mask.flag_all(t);
        } else {
            mask.or_flags(t, &ch_msk);
        }
    }
}

/// Fold the integration-anomaly detector's per-antenna votes into the mask:
/// every timestamp with at least [`MIN_AGREEING_ANTENNAS`] distinct antennas
/// voting gets all of its channels flagged.
pub(crate) fn apply_power_votes(mask: &mut Mask, votes: &BTreeMap<TimeKey, HashSet<u32>>) {
    for (&t, antennas) in votes {
        if antennas.len() >= MIN_AGREEING_ANTENNAS {
            debug!(
                "Timestamp {t} flagged anomalous by {} antennas; masking it",
                antennas.len()
            );
            mask.flag_all(t);
        }
    }
}
