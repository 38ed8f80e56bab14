//! Shared components for CLI commands

use crate::flags::{FlagCounts, QartodFlag};
use crate::stream::TestFailure;
use crate::summary::FlagSummary;
use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Run statistics reported at the end of a command
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub rows: usize,
    pub contexts: usize,
    pub calls: usize,
    pub results: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

/// Set up structured logging on stderr
pub fn setup_logging(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qartod_qc={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

pub fn create_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn colored_count(counts: &FlagCounts, flag: QartodFlag) -> ColoredString {
    let text = format!("{} {:>8} ({:5.1}%)", flag.name(), counts.get(flag), counts.percentage(flag));
    match flag {
        QartodFlag::Good => text.green(),
        QartodFlag::Unknown => text.normal(),
        QartodFlag::Suspect => text.yellow(),
        QartodFlag::Fail => text.red(),
        QartodFlag::Missing => text.dimmed(),
    }
}

/// Print per-stream flag counts
pub fn print_summary(summary: &FlagSummary) {
    println!("\n{}", "QARTOD flag summary".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (stream_id, counts) in summary {
        println!("{} ({} flags)", stream_id.cyan().bold(), counts.total);
        for flag in [
            QartodFlag::Good,
            QartodFlag::Suspect,
            QartodFlag::Fail,
            QartodFlag::Unknown,
            QartodFlag::Missing,
        ] {
            println!("   • {}", colored_count(counts, flag));
        }
    }
}

pub fn print_failures(failures: &[TestFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n{} {}", "⚠️  Failed tests:".yellow().bold(), failures.len());
    for failure in failures {
        println!(
            "   • {}: {}.{} in {}: {}",
            failure.stream_id,
            failure.package,
            failure.test,
            failure.context,
            failure.message.red()
        );
    }
}

pub fn print_stats(stats: &RunStats) {
    println!("\n📊 Run Summary:");
    println!("   • Rows: {}", stats.rows);
    println!("   • Contexts: {}", stats.contexts);
    println!("   • Calls: {}", stats.calls);
    println!("   • Collected results: {}", stats.results);
    println!("   • Failed tests: {}", stats.failures);
    println!("   • Time: {:.2?}", stats.elapsed);
}
