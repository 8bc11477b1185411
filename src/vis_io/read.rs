// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use super::{Baseline, VisReadError, VisRecord, FORMAT_VERSION, MAGIC};
use crate::c64;
use crate::mask::TimeKey;

/// A sequential reader over one visibility dataset. Supports rewinding to the
/// first record, which the detection and apply passes both need (the dataset
/// is read once to build statistics and again to rewrite records).
pub struct VisReader {
    path: PathBuf,
    file: BufReader<File>,
    num_chans: usize,
    history: String,
    /// Byte offset of the first record, for `rewind`.
    data_start: u64,
    /// The first record's timestamp; the dataset's persistence key.
    epoch: TimeKey,
}

impl VisReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<VisReader, VisReadError> {
        Self::open_inner(path.as_ref())
    }

    fn open_inner(path: &Path) -> Result<VisReader, VisReadError> {
        let io_err = |err: std::io::Error| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => VisReadError::Truncated {
                path: path.to_path_buf(),
            },
            _ => VisReadError::Io {
                path: path.to_path_buf(),
                err,
            },
        };

        let f = match File::open(path) {
            Ok(f) => f,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(VisReadError::NotFound(path.to_path_buf()))
            }
            Err(err) => {
                return Err(VisReadError::Io {
                    path: path.to_path_buf(),
                    err,
                })
            }
        };
        let mut file = BufReader::new(f);

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).map_err(io_err)?;
        if &magic != MAGIC {
            return Err(VisReadError::BadMagic {
                path: path.to_path_buf(),
            });
        }
        let version = file.read_u32::<LittleEndian>().map_err(io_err)?;
        if version != FORMAT_VERSION {
            return Err(VisReadError::UnsupportedVersion {
                path: path.to_path_buf(),
                version,
                supported: FORMAT_VERSION,
            });
        }
        let num_chans = file.read_u32::<LittleEndian>().map_err(io_err)? as usize;
        let history_len = file.read_u64::<LittleEndian>().map_err(io_err)? as usize;
        let mut history_bytes = vec![0u8; history_len];
        file.read_exact(&mut history_bytes).map_err(io_err)?;
        let history = String::from_utf8(history_bytes).map_err(|_| VisReadError::BadHistory {
            path: path.to_path_buf(),
        })?;
        let data_start = file.stream_position().map_err(io_err)?;

        let mut reader = VisReader {
            path: path.to_path_buf(),
            file,
            num_chans,
            history,
            data_start,
            epoch: TimeKey::default(),
        };

        // The first record's timestamp keys the mask store; an empty dataset
        // has no epoch and nothing to do.
        let first = reader.read_record()?.ok_or(VisReadError::Empty {
            path: path.to_path_buf(),
        })?;
        reader.epoch = first.time;
        reader.rewind()?;

        debug!(
            "Opened {}: {} channels, epoch {}",
            path.display(),
            num_chans,
            reader.epoch
        );
        Ok(reader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn epoch(&self) -> TimeKey {
        self.epoch
    }

    /// Seek back to the first record.
    pub fn rewind(&mut self) -> Result<(), VisReadError> {
        trace!("Rewinding {}", self.path.display());
        self.file
            .seek(SeekFrom::Start(self.data_start))
            .map_err(|err| VisReadError::Io {
                path: self.path.clone(),
                err,
            })?;
        Ok(())
    }

    /// Read the next record, or `None` at a clean end-of-file. EOF in the
    /// middle of a record is an error.
    pub fn read_record(&mut self) -> Result<Option<VisRecord>, VisReadError> {
        let time_micros = match self.read_record_time()? {
            Some(t) => t,
            None => return Ok(None),
        };

        let io_err = |err: std::io::Error| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => VisReadError::Truncated {
                path: self.path.clone(),
            },
            _ => VisReadError::Io {
                path: self.path.clone(),
                err,
            },
        };

        let ant1 = self.file.read_u32::<LittleEndian>().map_err(io_err)?;
        let ant2 = self.file.read_u32::<LittleEndian>().map_err(io_err)?;
        let pol = self.file.read_i32::<LittleEndian>().map_err(io_err)?;

        let mut data = Vec::with_capacity(self.num_chans);
        for _ in 0..self.num_chans {
            let re = self.file.read_f32::<LittleEndian>().map_err(io_err)?;
            let im = self.file.read_f32::<LittleEndian>().map_err(io_err)?;
            data.push(c64::new(f64::from(re), f64::from(im)));
        }
        let mut flag_bytes = vec![0u8; self.num_chans];
        self.file.read_exact(&mut flag_bytes).map_err(io_err)?;
        let flags = flag_bytes.into_iter().map(|b| b != 0).collect();

        Ok(Some(VisRecord {
            time: TimeKey::from_micros(time_micros),
            baseline: Baseline::new(ant1, ant2),
            pol,
            data,
            flags,
        }))
    }

    /// Read the leading timestamp of a record, distinguishing a clean EOF
    /// (`None`) from a file that ends partway through the field.
    fn read_record_time(&mut self) -> Result<Option<i64>, VisReadError> {
        let mut buf = [0u8; 8];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .file
                .read(&mut buf[filled..])
                .map_err(|err| VisReadError::Io {
                    path: self.path.clone(),
                    err,
                })?;
            if n == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(VisReadError::Truncated {
                        path: self.path.clone(),
                    })
                };
            }
            filled += n;
        }
        Ok(Some(i64::from_le_bytes(buf)))
    }
}
