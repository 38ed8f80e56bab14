//! Command-line argument definitions for the QARTOD QC runner
//!
//! The CLI is a thin wrapper over the library: it loads a QC configuration,
//! runs it against a CSV or Parquet table and writes the flag table.

use crate::constants::DEFAULT_ROLLUP_NAME;
use crate::error::{QcError, Result};
use crate::settings::{CompressionAlgorithm, QcSettings};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI arguments for the QARTOD QC runner
#[derive(Debug, Clone, Parser)]
#[command(
    name = "qartod-qc",
    version,
    about = "Run QARTOD quality-control tests over tabular time series",
    long_about = "Runs a declarative QC configuration (YAML or JSON) against a CSV or Parquet \
                  table of observations and writes one QARTOD flag column per stream and test, \
                  optionally with a total aggregate, to a Parquet file."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run a QC configuration against a table
    Run(RunArgs),
    /// List the registered test packages and tests
    Tests(TestsArgs),
}

/// Arguments for the run command
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// QC configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: PathBuf,

    /// Input table (CSV with a header row, or Parquet)
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Output Parquet file for the flag table
    ///
    /// When omitted the flag table is only summarised on stdout.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Settings file (YAML) with axis names and store options
    #[arg(long = "settings", value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Name of the time column
    #[arg(long = "time", value_name = "COLUMN")]
    pub time: Option<String>,

    /// Name of the depth column
    #[arg(long = "z", value_name = "COLUMN")]
    pub z: Option<String>,

    /// Name of the latitude column
    #[arg(long = "lat", value_name = "COLUMN")]
    pub lat: Option<String>,

    /// Name of the longitude column
    #[arg(long = "lon", value_name = "COLUMN")]
    pub lon: Option<String>,

    /// Add a total aggregate column over every flag column
    #[arg(long = "aggregate")]
    pub aggregate: bool,

    /// Column name of the total aggregate
    #[arg(long = "rollup-name", default_value = DEFAULT_ROLLUP_NAME)]
    pub rollup_name: String,

    /// Write the tested data columns next to the flags
    #[arg(long = "write-data")]
    pub write_data: bool,

    /// Only write flag columns matching these streams or tests
    #[arg(long = "include", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip flag columns matching these streams or tests
    #[arg(long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long = "compression")]
    pub compression: Option<String>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl RunArgs {
    pub fn get_log_level(&self) -> &'static str {
        log_level(self.verbose, self.quiet)
    }

    /// Check paths and option values before any work is done
    pub fn validate(&self) -> Result<()> {
        for path in [&self.config, &self.input] {
            if !path.exists() {
                return Err(QcError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
        }
        if let Some(name) = &self.compression {
            if CompressionAlgorithm::from_name(name).is_none() {
                return Err(QcError::config(format!(
                    "unknown compression '{name}', expected snappy, zstd, lz4 or none"
                )));
            }
        }
        Ok(())
    }

    /// Settings from the settings file (or defaults) with command-line
    /// overrides applied
    pub fn to_settings(&self) -> Result<QcSettings> {
        let mut settings = match &self.settings {
            Some(path) => QcSettings::from_yaml_file(path)?,
            None => QcSettings::default(),
        };

        let axes = &mut settings.axes;
        if let Some(time) = &self.time {
            axes.time = time.clone();
        }
        if let Some(z) = &self.z {
            axes.z = z.clone();
        }
        if let Some(lat) = &self.lat {
            axes.lat = lat.clone();
        }
        if let Some(lon) = &self.lon {
            axes.lon = lon.clone();
        }

        if self.aggregate {
            settings = settings.with_rollup(self.rollup_name.clone());
        }
        if self.write_data {
            settings = settings.with_write_data();
        }
        if let Some(compression) = self.compression.as_deref().and_then(CompressionAlgorithm::from_name) {
            settings = settings.with_compression(compression);
        }
        Ok(settings)
    }

    pub fn is_parquet_input(&self) -> bool {
        is_parquet(&self.input)
    }
}

/// Arguments for the tests command
#[derive(Debug, Clone, Parser)]
pub struct TestsArgs {
    /// Only list tests of this package
    #[arg(short = 'p', long = "package")]
    pub package: Option<String>,
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "parquet" | "pq"))
}
