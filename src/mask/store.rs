// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing `.xrfi` mask files.
//!
//! A mask is keyed by its dataset's epoch (the first record's timestamp), so
//! that a mask detected on one dataset can be applied to another sharing the
//! same time axis. One file per epoch, named by the epoch's fixed-point
//! rendering, living next to the dataset it was computed from.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::trace;

use super::{Mask, MaskReadError, MaskWriteError, TimeKey};

pub(crate) const MASK_EXTENSION: &str = "xrfi";

/// The canonical path of the mask file for a dataset with the given epoch,
/// placed in `dir`.
pub(crate) fn mask_path(dir: &Path, epoch: TimeKey) -> PathBuf {
    dir.join(format!("{epoch}.{MASK_EXTENSION}"))
}

pub(crate) fn write(mask: &Mask, path: &Path) -> Result<(), MaskWriteError> {
    trace!("Writing mask with {} timestamps to {}", mask.num_times(), path.display());
    let f = File::create(path).map_err(|err| MaskWriteError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    serde_json::to_writer(BufWriter::new(f), mask)?;
    Ok(())
}

pub(crate) fn read(path: &Path) -> Result<Mask, MaskReadError> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(MaskReadError::NotFound(path.to_path_buf()))
        }
        Err(err) => {
            return Err(MaskReadError::Io {
                path: path.to_path_buf(),
                err,
            })
        }
    };
    let mask: Mask = serde_json::from_reader(BufReader::new(f)).map_err(|err| {
        MaskReadError::Parse {
            path: path.to_path_buf(),
            err,
        }
    })?;
    // Guard against hand-edited files; the rest of the crate assumes
    // rectangular masks.
    if mask
        .times()
        .any(|t| mask.row(t).map(|r| r.len()) != Some(mask.num_chans()))
    {
        return Err(MaskReadError::RaggedRows {
            path: path.to_path_buf(),
        });
    }
    Ok(mask)
}
