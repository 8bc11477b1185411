// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use super::TimeKey;

#[derive(Error, Debug)]
pub enum MaskReadError {
    #[error("No mask file exists at {0}")]
    NotFound(PathBuf),

    #[error("Mask file {path} could not be parsed: {err}")]
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },

    #[error("Mask file {path} has rows of differing channel counts")]
    RaggedRows { path: PathBuf },

    #[error("IO error when reading {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MaskWriteError {
    #[error("Couldn't serialise the mask: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("IO error when writing {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MaskApplyError {
    #[error("Timestamp {t} is not covered by the mask; was it made from a dataset with a different time axis?")]
    TimestampNotCovered { t: TimeKey },
}
