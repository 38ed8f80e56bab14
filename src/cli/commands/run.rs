//! Run command implementation
//!
//! Loads the QC configuration and the input table, runs every configured
//! test, collects the flags into a table and writes it when an output path
//! is given.

use super::shared::{RunStats, create_spinner, print_failures, print_stats, print_summary, setup_logging};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::store::{ColumnFilter, TableStore};
use crate::stream::{QcStream, TableStream};
use crate::summary::summarize_flags;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info, info_span};

pub fn run_qc(args: RunArgs) -> Result<RunStats> {
    let start_time = Instant::now();
    setup_logging(args.get_log_level())?;
    debug!("Run arguments: {:?}", args);

    args.validate()?;
    let settings = args.to_settings().context("Failed to load settings")?;

    let config = Config::from_path(&args.config)
        .with_context(|| format!("Failed to load QC configuration {}", args.config.display()))?;
    info!(
        "Loaded {} calls in {} contexts from {}",
        config.len(),
        config.contexts().len(),
        args.config.display()
    );

    let stream = if args.is_parquet_input() {
        TableStream::from_parquet(&args.input, settings.axes.clone())
    } else {
        TableStream::from_csv(&args.input, settings.axes.clone())
    }
    .with_context(|| format!("Failed to read {}", args.input.display()))?
    .with_span(info_span!("run", input = %args.input.display()));
    info!("Read {} rows from {}", stream.height(), args.input.display());

    let spinner = (!args.quiet).then(|| create_spinner("Running QC tests...")).transpose()?;
    let store = TableStore::from_results(stream.run(&config), settings)
        .context("Failed to run QC configuration")?;
    if let Some(pb) = &spinner {
        pb.finish_with_message("QC tests completed");
    }

    let mut filter = ColumnFilter::new();
    if !args.include.is_empty() {
        filter = filter.include(args.include.iter().cloned());
    }
    if !args.exclude.is_empty() {
        filter = filter.exclude(args.exclude.iter().cloned());
    }

    match &args.output {
        Some(path) => {
            let df = store
                .save(path, &filter)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} flag table columns to {}", df.width(), path.display());
        }
        None => {
            let df = store.to_dataframe(&filter)?;
            println!("{}", df.head(Some(10)));
        }
    }

    let collected = store.collected();
    let stats = RunStats {
        rows: stream.height(),
        contexts: config.contexts().len(),
        calls: config.len(),
        results: collected.len(),
        failures: collected.failures().len(),
        elapsed: start_time.elapsed(),
    };

    if !args.quiet {
        print_summary(&summarize_flags(collected));
        print_failures(collected.failures());
        print_stats(&stats);
    }
    Ok(stats)
}
