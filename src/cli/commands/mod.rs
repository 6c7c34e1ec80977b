//! Command implementations for the spatial QC CLI
//!
//! This module contains the command execution logic, progress reporting,
//! and error handling for the CLI interface. Each command is implemented in
//! its own module.

pub mod check;
pub mod cross_validate;
pub mod shared;

pub use shared::RunStats;

use crate::cli::args::{Args, Commands};
use crate::{Error, Result};

/// Main command runner
///
/// Dispatches to the subcommand handler:
/// - `check`: quality control with optional Parquet reports
/// - `cross-validate`: quality control followed by cross-validation error
pub async fn run(args: Args) -> Result<RunStats> {
    match args.command {
        Some(Commands::Check(check_args)) => check::run_check(check_args).await,
        Some(Commands::CrossValidate(cv_args)) => {
            cross_validate::run_cross_validate(cv_args).await
        }
        None => Err(Error::configuration("No command given")),
    }
}
