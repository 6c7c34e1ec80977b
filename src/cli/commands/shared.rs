//! Shared components for CLI commands
//!
//! Logging setup, configuration loading, network loading, the concurrent
//! per-variable runner and summary output used by every command.

use crate::app::services::reference_interpolator::InverseDistanceInterpolator;
use crate::app::services::spatial_control::{QcReport, SpatialQualityController};
use crate::app::services::station_io::{load_observations, load_stations};
use crate::app::services::syntactic_qc::RangeQualityControl;
use crate::cli::args::InputArgs;
use crate::config::QcConfig;
use crate::models::{MeteoVariable, Station};
use crate::{Error, Result};
use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Controller type used by the command line
pub type CliController = SpatialQualityController<InverseDistanceInterpolator, RangeQualityControl>;

/// Run statistics for reporting across all commands
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Number of stations loaded
    pub stations_loaded: usize,
    /// Number of observations attached to stations
    pub observations_loaded: usize,
    /// Reports of the variables that completed, ordered by variable name
    pub reports: Vec<QcReport>,
    /// Variables that failed, with the error message
    pub failures: Vec<(MeteoVariable, String)>,
    /// Total processing time
    pub processing_time: Duration,
}

impl RunStats {
    /// Total stations flagged by the spatial detector across variables
    pub fn total_wrong_spatial(&self) -> usize {
        self.reports.iter().map(|report| report.wrong_spatial).sum()
    }

    /// Get the report for one variable
    pub fn report(&self, variable: MeteoVariable) -> Option<&QcReport> {
        self.reports.iter().find(|report| report.variable == variable)
    }
}

/// Set up structured logging
pub fn setup_logging(input: &InputArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = input.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spatial_qc={}", log_level)));

    let result = if input.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.map_err(|e| Error::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration from file, falling back to defaults
///
/// The result is not validated yet; commands apply their overrides first.
pub fn load_configuration(input: &InputArgs) -> Result<QcConfig> {
    match &input.config_file {
        Some(path) => {
            info!("Using config file: {}", path.display());
            QcConfig::from_toml_file(path)
        }
        None => {
            info!("No config file given, using defaults");
            Ok(QcConfig::default())
        }
    }
}

/// Build the controller used for one variable
pub fn build_controller(config: &QcConfig) -> CliController {
    SpatialQualityController::new(
        InverseDistanceInterpolator::new(),
        RangeQualityControl::new(config.syntactic.clone()),
        config.clone(),
    )
}

/// Load station metadata and observations on a blocking worker
pub async fn load_network(input: &InputArgs) -> Result<(Vec<Station>, usize)> {
    let stations_path = input.stations.clone();
    let observations_path = input.observations.clone();

    tokio::task::spawn_blocking(move || {
        let mut stations = load_stations(&stations_path)?;
        let attached = load_observations(&observations_path, &mut stations)?;
        Ok::<_, Error>((stations, attached))
    })
    .await
    .map_err(|e| Error::io("Station loading task failed", std::io::Error::other(e)))?
}

/// Run one job per variable concurrently
///
/// Every job gets its own copy of the network, so flags raised for one
/// variable never leak into another. Failures are logged and collected
/// rather than aborting the run.
pub async fn run_variables<F>(input: &InputArgs, job: F) -> Result<RunStats>
where
    F: Fn(&mut Vec<Station>, MeteoVariable) -> Result<QcReport> + Send + Sync + 'static,
{
    let start_time = Instant::now();
    let (stations, observations_loaded) = load_network(input).await?;

    let mut stats = RunStats {
        stations_loaded: stations.len(),
        observations_loaded,
        ..Default::default()
    };

    let variables = input.get_variables();
    info!(
        "Checking {} variables over {} stations",
        variables.len(),
        stations.len()
    );

    let progress_bar = input
        .show_progress()
        .then(|| create_progress_bar(variables.len() as u64, "Checking variables"));

    let stations = Arc::new(stations);
    let job = Arc::new(job);

    let results = stream::iter(variables)
        .map(|variable| {
            let stations = Arc::clone(&stations);
            let job = Arc::clone(&job);
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    let mut stations = stations.as_ref().clone();
                    (*job)(&mut stations, variable)
                })
                .await
                .map_err(|e| Error::io("QC worker task failed", std::io::Error::other(e)))
                .and_then(|result| result);
                (variable, result)
            }
        })
        .buffer_unordered(input.workers)
        .inspect(|(variable, _)| {
            if let Some(pb) = &progress_bar {
                pb.inc(1);
                pb.set_message(format!("Finished {}", variable));
            }
        })
        .collect::<Vec<_>>()
        .await;

    if let Some(pb) = &progress_bar {
        pb.finish_with_message("Quality control complete");
    }

    for (variable, result) in results {
        match result {
            Ok(report) => {
                debug!("{}", report.summary());
                stats.reports.push(report);
            }
            Err(e) => {
                error!("Quality control failed for {}: {}", variable, e);
                stats.failures.push((variable, e.to_string()));
            }
        }
    }

    // Completion order is arbitrary
    stats.reports.sort_by_key(|report| report.variable.name());
    stats.failures.sort_by_key(|(variable, _)| variable.name());
    stats.processing_time = start_time.elapsed();
    Ok(stats)
}

/// Create a progress bar with appropriate styling
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Print the run summary to stdout
pub fn print_summary(stats: &RunStats, input: &InputArgs) {
    if input.quiet {
        return;
    }

    println!("\n{}", "Spatial QC Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(stats.processing_time).to_string().bright_white()
    );
    println!(
        "  {} {} ({} observations)",
        "Stations:".bright_cyan(),
        stats.stations_loaded.to_string().bright_white(),
        stats.observations_loaded
    );
    println!("  {} {}", "Time step:".bright_cyan(), input.time);

    for report in &stats.reports {
        let flagged = report.wrong_spatial.to_string();
        let flagged = if report.wrong_spatial > 0 {
            flagged.bright_red().bold()
        } else {
            flagged.bright_white()
        };
        println!(
            "\n  {} {}",
            "Variable:".bright_cyan(),
            report.variable.to_string().bright_white().bold()
        );
        println!(
            "    accepted {} | missing {} | syntactic {} | spatial {} | staged {}",
            report.accepted,
            report.missing_data,
            report.wrong_syntactic,
            flagged,
            report.staged_points
        );
        if let Some(spatial) = &report.spatial {
            if !spatial.unverified().is_empty() {
                println!(
                    "    {} {} flags kept without verification",
                    "Warning:".bright_yellow(),
                    spatial.unverified().len()
                );
            }
        }
        if let Some(mae) = report.cross_validation_mae {
            println!("    {} {:.3}", "Cross-validation MAE:".bright_cyan(), mae);
        }
    }

    for (variable, message) in &stats.failures {
        println!(
            "\n  {} {}: {}",
            "Failed:".bright_red(),
            variable.to_string().bright_red().bold(),
            message
        );
    }
}

#[cfg(test)]
pub mod test_support {
    use crate::cli::args::InputArgs;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    pub fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    /// Five stations, S0 10 degrees warmer than its neighbours
    pub fn network_files() -> (NamedTempFile, NamedTempFile) {
        let stations = csv_file(
            "id,name,utm_x,utm_y,elevation\n\
             S0,Centre,0,0,100\n\
             S1,East,1000,0,100\n\
             S2,West,-1000,0,100\n\
             S3,North,0,1000,100\n\
             S4,South,0,-1000,100\n",
        );
        let observations = csv_file(
            "id,variable,time,value\n\
             S0,air-temperature,2024-07-01 12:00:00,15\n\
             S1,air-temperature,2024-07-01 12:00:00,5\n\
             S2,air-temperature,2024-07-01 12:00:00,5\n\
             S3,air-temperature,2024-07-01 12:00:00,4\n\
             S4,air-temperature,2024-07-01 12:00:00,6\n",
        );
        (stations, observations)
    }

    pub fn input_args(stations: &Path, observations: &Path, variables: &str) -> InputArgs {
        InputArgs {
            stations: stations.to_path_buf(),
            observations: observations.to_path_buf(),
            time: Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
            variables: Some(variables.parse().unwrap()),
            config_file: None,
            workers: 2,
            verbose: 0,
            quiet: true,
        }
    }
}
