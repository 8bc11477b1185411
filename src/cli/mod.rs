// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. Each dataset on the command line is processed
//! independently; a failure on one is reported and the batch moves on.

mod error;

pub use error::XrfiError;

use std::path::{Path, PathBuf};

use clap::Parser;
use itertools::Itertools;
use log::{error, info, warn};
use strum::IntoEnumIterator;

use crate::chanspec;
use crate::flagging::{self, FlagMode, FlagParams};
use crate::mask::{store, Mask, MaskReadError};
use crate::vis_io::{VisReader, VisWriter};

lazy_static::lazy_static! {
    static ref FLAGMODE_HELP: String = format!(
        "Which detectors to run ({}). \"val\" flags outlying cells on cross-correlations, \
        \"int\" flags whole integrations by autocorrelation power, \"both\" runs both, \
        \"none\" keeps only pre-existing and manually-specified flags.",
        FlagMode::iter().join(", ")
    );
}

#[derive(Debug, Parser)]
#[clap(
    version,
    about = "Detect and flag RFI in visibility datasets. Statistical thresholding identifies \
    outliers in sample values and integrated power; the resulting mask is shared by all \
    baselines and either applied in place or stored for reuse on a dataset with the same epoch."
)]
#[clap(infer_long_args = true)]
pub struct Xrfi {
    /// Manually flag channels before processing. Either a comma-separated
    /// list of channel indices ("0,1,60") or an underscore range ("60_70").
    #[clap(short = 'c', long)]
    chan: Option<String>,

    /// Number of standard deviations above the mean at which the
    /// value-outlier detector flags.
    #[clap(short = 'n', long, default_value = "2.0")]
    nsig: f64,

    #[clap(short = 'm', long, default_value = "both", help = FLAGMODE_HELP.as_str())]
    flagmode: FlagMode,

    /// Fraction of timestamps in a channel which, if flagged, flags the
    /// entire channel.
    #[clap(long, default_value = "0.33")]
    ch_thresh: f64,

    /// Fraction of channels in an integration which, if flagged, flags the
    /// entire integration.
    #[clap(long, default_value = "0.99")]
    int_thresh: f64,

    /// Apply flags previously stored with --outfile instead of detecting.
    /// The mask file is looked up by the dataset's epoch.
    #[clap(short = 'i', long, conflicts_with = "outfile")]
    infile: bool,

    /// Rather than applying the mask to the data, store it in a file named by
    /// the dataset's epoch, to apply to a different dataset with the same
    /// epoch.
    #[clap(short = 'o', long)]
    outfile: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Paths to the visibility datasets to process.
    #[clap(name = "DATASETS", parse(from_os_str), required = true)]
    datasets: Vec<PathBuf>,
}

/// What happened to one dataset.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The output dataset already exists; nothing was done.
    OutputExists(PathBuf),

    /// `--infile` was given but no stored mask exists for the epoch.
    NoStoredMask(PathBuf),

    /// The mask was written to the given `.xrfi` file.
    StoredMask(PathBuf),

    /// A flagged copy of the dataset was written.
    WroteDataset(PathBuf),
}

impl Xrfi {
    pub fn run(self) -> Result<(), XrfiError> {
        setup_logging(self.verbosity).expect("Failed to initialise logging.");
        info!("xrfi {}", env!("CARGO_PKG_VERSION"));

        for dataset in &self.datasets {
            match self.process_dataset(dataset) {
                Ok(Outcome::OutputExists(out)) => {
                    info!("{} exists, skipping.", out.display())
                }
                Ok(Outcome::NoStoredMask(mask_file)) => {
                    warn!("{} does not exist. Skipping...", mask_file.display())
                }
                Ok(Outcome::StoredMask(mask_file)) => {
                    info!("Wrote {}", mask_file.display())
                }
                Ok(Outcome::WroteDataset(out)) => {
                    info!("{} -> {}", dataset.display(), out.display())
                }
                // Report and carry on; one bad dataset mustn't kill the
                // batch.
                Err(e) => error!("{}: {e}", dataset.display()),
            }
        }

        Ok(())
    }

    pub(crate) fn process_dataset(&self, path: &Path) -> Result<Outcome, XrfiError> {
        let out_path = flagged_output_path(path);
        // Coarse idempotence guard: never overwrite a previous run's output.
        if out_path.exists() {
            return Ok(Outcome::OutputExists(out_path));
        }

        let mut reader = VisReader::open(path)?;
        let mask_file = store::mask_path(
            path.parent().unwrap_or_else(|| Path::new(".")),
            reader.epoch(),
        );

        let mask: Mask = if self.infile {
            match store::read(&mask_file) {
                Ok(mask) => {
                    info!("    Using {}", mask_file.display());
                    mask
                }
                Err(MaskReadError::NotFound(p)) => return Ok(Outcome::NoStoredMask(p)),
                Err(e) => return Err(e.into()),
            }
        } else {
            let params = FlagParams {
                nsig: self.nsig,
                mode: self.flagmode,
                ch_thresh: self.ch_thresh,
                int_thresh: self.int_thresh,
                manual_chans: chanspec::parse_chans(self.chan.as_deref(), reader.num_chans()),
            };
            flagging::detect(&mut reader, &params)?
        };

        if self.outfile {
            store::write(&mask, &mask_file)?;
            return Ok(Outcome::StoredMask(mask_file));
        }

        // Apply the mask record by record into a mirrored dataset, recording
        // the parameters used in the history.
        let history = format!(
            "XRFI: nsig={} chans={} mode={} ch_thresh={} int_thresh={}\n",
            self.nsig,
            self.chan.as_deref().unwrap_or("None"),
            self.flagmode,
            self.ch_thresh,
            self.int_thresh,
        );
        reader.rewind()?;
        let mut writer = VisWriter::create_from(&reader, &out_path, &history)?;
        while let Some(mut record) = reader.read_record()? {
            let (data, flags) = mask.apply(record.time, &record.data)?;
            record.data = data;
            record.flags = flags;
            writer.write_record(&record)?;
        }
        writer.finish()?;
        Ok(Outcome::WroteDataset(out_path))
    }
}

/// The original dataset's path with "r" appended to the file name.
fn flagged_output_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push("r");
    path.with_file_name(name)
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();

    Ok(())
}
