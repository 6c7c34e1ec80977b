//! Command-line argument definitions for spatial QC
//!
//! This module defines the CLI interface using the clap derive API.

use crate::app::services::station_io::parse_time;
use crate::config::ResidualStrategy;
use crate::constants::DEFAULT_PARALLEL_WORKERS;
use crate::models::MeteoVariable;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the spatial quality control tool
///
/// Checks meteorological station observations for spatial consistency
/// before they are handed to an interpolation engine.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spatial-qc",
    version,
    about = "Spatial quality control for meteorological station networks",
    long_about = "Runs syntactic and two-pass spatial quality control over a station network \
                  at one time step. Each station's observation is compared against an estimate \
                  built from its neighbours; stations whose residual exceeds a variable-specific \
                  envelope are flagged. Also reports cross-validation error of the network."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run quality control and report flagged stations
    Check(CheckArgs),
    /// Run quality control, then report cross-validation error
    CrossValidate(CrossValidateArgs),
}

/// Input and runtime options shared by every command
#[derive(Debug, Clone, ClapArgs)]
pub struct InputArgs {
    /// Station metadata CSV
    ///
    /// Columns: id, utm_x, utm_y, elevation, and optionally name,
    /// latitude, longitude, active, lapse_rate_code.
    #[arg(short = 's', long = "stations", value_name = "FILE")]
    pub stations: PathBuf,

    /// Observations CSV in long format
    ///
    /// Columns: id, variable, time, value.
    #[arg(short = 'b', long = "observations", value_name = "FILE")]
    pub observations: PathBuf,

    /// Time step to check (RFC 3339 or "YYYY-MM-DD HH:MM:SS", UTC)
    #[arg(short = 't', long = "time", value_name = "TIME", value_parser = parse_time_arg)]
    pub time: DateTime<Utc>,

    /// Variables to check (comma-separated, e.g. air-temperature,air-rel-humidity)
    #[arg(long = "variables", value_name = "LIST")]
    pub variables: Option<VariableList>,

    /// Path to configuration file (TOML format)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Number of variables processed concurrently
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        default_value_t = num_cpus::get().clamp(1, DEFAULT_PARALLEL_WORKERS)
    )]
    pub workers: usize,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Arguments for the check command
#[derive(Debug, Clone, Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory for per-variable Parquet QC reports
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Skip the spatial detector (syntactic checks only)
    #[arg(long = "no-spatial")]
    pub no_spatial: bool,
}

/// Arguments for the cross-validate command
#[derive(Debug, Clone, Parser)]
pub struct CrossValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Residual strategy; overrides the configuration file
    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<StrategyArg>,
}

/// Residual strategies available from the command line
///
/// The glocal strategy needs macro-area definitions and is only available
/// through the library API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Global,
    Local,
}

impl From<StrategyArg> for ResidualStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Global => ResidualStrategy::Global,
            StrategyArg::Local => ResidualStrategy::Local,
        }
    }
}

fn parse_time_arg(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_time(value).map_err(|e| e.to_string())
}

/// Wrapper for parsing comma-separated variable lists
#[derive(Debug, Clone, PartialEq)]
pub struct VariableList {
    pub variables: Vec<MeteoVariable>,
}

impl FromStr for VariableList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let variables = s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(MeteoVariable::from_str)
            .collect::<Result<Vec<_>>>()?;

        if variables.is_empty() {
            return Err(Error::data_validation("Variable list cannot be empty"));
        }

        Ok(VariableList { variables })
    }
}

impl InputArgs {
    /// Validate the input arguments for consistency
    pub fn validate(&self) -> Result<()> {
        for (label, path) in [("Stations", &self.stations), ("Observations", &self.observations)] {
            if !path.is_file() {
                return Err(Error::configuration(format!(
                    "{} file does not exist: {}",
                    label,
                    path.display()
                )));
            }
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if self.workers == 0 {
            return Err(Error::configuration(
                "Number of workers must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Variables to check, defaulting to air temperature
    pub fn get_variables(&self) -> Vec<MeteoVariable> {
        match &self.variables {
            Some(list) => list.variables.clone(),
            None => vec![MeteoVariable::AirTemperature],
        }
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl Commands {
    pub fn input(&self) -> &InputArgs {
        match self {
            Commands::Check(args) => &args.input,
            Commands::CrossValidate(args) => &args.input,
        }
    }
}
