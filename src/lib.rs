// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
RFI detection and flagging for radio interferometer visibility data.

Two statistical detectors (a per-baseline value-outlier test on
cross-correlations and a per-antenna integrated-power test on
autocorrelations) feed a shared per-timestamp, per-channel mask, which is
escalated by channel and integration occupancy thresholds. The mask is
either persisted to a `.xrfi` file keyed by the dataset's first timestamp,
or applied in place to produce a flagged copy of the dataset.
 */

pub mod chanspec;
pub mod cli;
pub mod flagging;
pub mod mask;
pub mod vis_io;

// Re-exports.
pub use cli::XrfiError;
pub use mask::{Mask, TimeKey};

/// A double-precision complex visibility value.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;
