// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sequential reading and writing of visibility datasets.
//!
//! The on-disk layout is deliberately simple: a small header (magic, format
//! version, channel count, free-text history), then records until EOF. Each
//! record is one (antenna pair, polarisation, timestamp) sample vector with
//! its flag vector. Records are stored time-ordered by convention but the
//! reader doesn't insist on it; the detectors sort by timestamp themselves.

mod error;
mod read;
mod write;

pub use error::{VisReadError, VisWriteError};
pub use read::VisReader;
pub use write::VisWriter;

use crate::mask::TimeKey;
use crate::c64;

pub(crate) const MAGIC: &[u8; 4] = b"XRFI";
pub(crate) const FORMAT_VERSION: u32 = 1;

/// An unordered pair of antenna indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Baseline {
    pub ant1: u32,
    pub ant2: u32,
}

impl Baseline {
    pub fn new(ant1: u32, ant2: u32) -> Baseline {
        // Normalise so that (2, 1) and (1, 2) are the same baseline.
        if ant1 <= ant2 {
            Baseline { ant1, ant2 }
        } else {
            Baseline {
                ant1: ant2,
                ant2: ant1,
            }
        }
    }

    /// Is this baseline an antenna correlated with itself?
    pub fn is_auto(self) -> bool {
        self.ant1 == self.ant2
    }
}

impl std::fmt::Display for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.ant1, self.ant2)
    }
}

/// One visibility record: a complex sample per channel plus the channel
/// flags, for one baseline, polarisation and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct VisRecord {
    pub time: TimeKey,
    pub baseline: Baseline,
    /// AIPS-convention polarisation code (e.g. -5 for XX). The detectors
    /// treat this as an opaque grouping key.
    pub pol: i32,
    pub data: Vec<c64>,
    pub flags: Vec<bool>,
}
