// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisReadError {
    #[error("No visibility dataset exists at {0}")]
    NotFound(PathBuf),

    #[error("{path} is not a visibility dataset (bad magic bytes)")]
    BadMagic { path: PathBuf },

    #[error("{path} uses format version {version}, but only version {supported} is supported")]
    UnsupportedVersion {
        path: PathBuf,
        version: u32,
        supported: u32,
    },

    #[error("{path} ends mid-record; the file is truncated or corrupt")]
    Truncated { path: PathBuf },

    #[error("{path} contains no records")]
    Empty { path: PathBuf },

    #[error("The history text in {path} is not valid UTF-8")]
    BadHistory { path: PathBuf },

    #[error("IO error when reading {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum VisWriteError {
    #[error("Record has {got} channels but the dataset was created with {expected}")]
    WrongChannelCount { expected: usize, got: usize },

    #[error("IO error when writing {path}: {err}")]
    Io {
        path: PathBuf,
        err: std::io::Error,
    },
}
