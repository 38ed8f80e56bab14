use clap::Parser;
use qartod_qc::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(_stats) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("qartod-qc - QARTOD quality control for time series");
    println!("===================================================");
    println!();
    println!("Run declarative QARTOD QC configurations against tabular observations");
    println!("and write one flag column per stream and test.");
    println!();
    println!("USAGE:");
    println!("    qartod-qc <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    run         Run a QC configuration against a CSV or Parquet table");
    println!("    tests       List the registered test packages and tests");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Flag a CSV table and write the flags with a total aggregate:");
    println!("    qartod-qc run --config qc.yaml --input obs.csv --output flags.parquet --aggregate");
    println!();
    println!("    # Use custom axis column names:");
    println!("    qartod-qc run -c qc.yaml -i obs.parquet --time obs_time --lat latitude --lon longitude");
    println!();
    println!("For detailed help on any command, use:");
    println!("    qartod-qc <COMMAND> --help");
}
