// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all xrfi-related errors.

use thiserror::Error;

use crate::flagging::FlagError;
use crate::mask::{MaskApplyError, MaskReadError, MaskWriteError};
use crate::vis_io::{VisReadError, VisWriteError};

#[derive(Error, Debug)]
pub enum XrfiError {
    #[error("{0}")]
    Flag(#[from] FlagError),

    #[error("{0}")]
    VisRead(#[from] VisReadError),

    #[error("{0}")]
    VisWrite(#[from] VisWriteError),

    #[error("{0}")]
    MaskRead(#[from] MaskReadError),

    #[error("{0}")]
    MaskWrite(#[from] MaskWriteError),

    #[error("{0}")]
    MaskApply(#[from] MaskApplyError),
}
