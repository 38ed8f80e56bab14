//! Command implementations for the QARTOD QC CLI
//!
//! Each command lives in its own module:
//! - `run`: run a configuration against a table and store the flags
//! - `tests`: list the registered test packages

pub mod run;
pub mod shared;
pub mod tests;

pub use shared::RunStats;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Dispatch to the subcommand handler
pub fn run(args: Args) -> Result<RunStats> {
    match args.command {
        Some(Commands::Run(run_args)) => run::run_qc(run_args),
        Some(Commands::Tests(tests_args)) => {
            tests::list_tests(&tests_args);
            Ok(RunStats::default())
        }
        None => Ok(RunStats::default()),
    }
}
