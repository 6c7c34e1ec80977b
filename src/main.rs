use anyhow::Context;
use clap::Parser;
use spatial_qc::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = match tokio::runtime::Runtime::new().context("Failed to create async runtime")
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to install CTRL+C signal handler: {}", error);
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = commands::run(args) => result.map_err(anyhow::Error::from),
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Quality control interrupted by user"))
            }
        }
    });

    match result {
        Ok(stats) => {
            // Flagged stations are a result, not a failure
            if stats.reports.is_empty() && !stats.failures.is_empty() {
                process::exit(2);
            }
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Spatial QC - Meteorological Station Network Quality Control");
    println!("============================================================");
    println!();
    println!("Check station observations for syntactic and spatial consistency");
    println!("before they are handed to a spatial interpolation engine.");
    println!();
    println!("USAGE:");
    println!("    spatial-qc <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    check             Run quality control and report flagged stations");
    println!("    cross-validate    Run quality control, then report cross-validation error");
    println!("    help              Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Check air temperature at one time step:");
    println!("    spatial-qc check -s stations.csv -b observations.csv -t \"2024-07-01 12:00:00\"");
    println!();
    println!("    # Check several variables and write Parquet reports:");
    println!("    spatial-qc check -s stations.csv -b observations.csv -t 2024-07-01T12:00:00Z \\");
    println!("                     --variables air-temperature,air-rel-humidity -o reports/");
    println!();
    println!("    # Cross-validate with local detrending:");
    println!("    spatial-qc cross-validate -s stations.csv -b observations.csv \\");
    println!("                              -t \"2024-07-01 12:00:00\" --strategy local");
    println!();
    println!("For detailed help on any command, use:");
    println!("    spatial-qc <COMMAND> --help");
}
