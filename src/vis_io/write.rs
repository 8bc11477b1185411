// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use super::{VisReader, VisRecord, VisWriteError, FORMAT_VERSION, MAGIC};

/// Writes a new visibility dataset. Usually created with [`create_from`] to
/// mirror an input dataset's header while appending a history line recording
/// what was done to the data.
///
/// [`create_from`]: VisWriter::create_from
pub struct VisWriter {
    path: PathBuf,
    file: BufWriter<File>,
    num_chans: usize,
}

impl VisWriter {
    pub fn create<P: AsRef<Path>>(
        path: P,
        num_chans: usize,
        history: &str,
    ) -> Result<VisWriter, VisWriteError> {
        Self::create_inner(path.as_ref(), num_chans, history)
    }

    /// Create a dataset mirroring `reader`'s header, with `extra_history`
    /// appended to the input's history text.
    pub fn create_from<P: AsRef<Path>>(
        reader: &VisReader,
        path: P,
        extra_history: &str,
    ) -> Result<VisWriter, VisWriteError> {
        let mut history = reader.history().to_string();
        history.push_str(extra_history);
        Self::create_inner(path.as_ref(), reader.num_chans(), &history)
    }

    fn create_inner(path: &Path, num_chans: usize, history: &str) -> Result<VisWriter, VisWriteError> {
        let io_err = |err: std::io::Error| VisWriteError::Io {
            path: path.to_path_buf(),
            err,
        };

        debug!("Creating {} ({} channels)", path.display(), num_chans);
        let mut file = BufWriter::new(File::create(path).map_err(io_err)?);
        file.write_all(MAGIC).map_err(io_err)?;
        file.write_u32::<LittleEndian>(FORMAT_VERSION).map_err(io_err)?;
        file.write_u32::<LittleEndian>(num_chans as u32).map_err(io_err)?;
        file.write_u64::<LittleEndian>(history.len() as u64).map_err(io_err)?;
        file.write_all(history.as_bytes()).map_err(io_err)?;

        Ok(VisWriter {
            path: path.to_path_buf(),
            file,
            num_chans,
        })
    }

    pub fn write_record(&mut self, record: &VisRecord) -> Result<(), VisWriteError> {
        if record.data.len() != self.num_chans || record.flags.len() != self.num_chans {
            return Err(VisWriteError::WrongChannelCount {
                expected: self.num_chans,
                got: record.data.len().max(record.flags.len()),
            });
        }

        let io_err = |err: std::io::Error| VisWriteError::Io {
            path: self.path.clone(),
            err,
        };

        self.file
            .write_i64::<LittleEndian>(record.time.as_micros())
            .map_err(io_err)?;
        self.file
            .write_u32::<LittleEndian>(record.baseline.ant1)
            .map_err(io_err)?;
        self.file
            .write_u32::<LittleEndian>(record.baseline.ant2)
            .map_err(io_err)?;
        self.file.write_i32::<LittleEndian>(record.pol).map_err(io_err)?;
        for d in &record.data {
            self.file.write_f32::<LittleEndian>(d.re as f32).map_err(io_err)?;
            self.file.write_f32::<LittleEndian>(d.im as f32).map_err(io_err)?;
        }
        for &f in &record.flags {
            self.file.write_u8(u8::from(f)).map_err(io_err)?;
        }
        Ok(())
    }

    /// Flush and close the file. Dropping the writer without calling this
    /// loses any buffered-write error.
    pub fn finish(mut self) -> Result<(), VisWriteError> {
        self.file.flush().map_err(|err| VisWriteError::Io {
            path: self.path.clone(),
            err,
        })
    }
}
