//! Check command implementation
//!
//! Runs the full quality control chain per variable, stages the surviving
//! observations and optionally writes one Parquet report per variable.

use crate::app::services::spatial_control::QcReport;
use crate::app::services::station_io::write_qc_report;
use crate::cli::args::{CheckArgs, InputArgs};
use crate::cli::commands::shared::{
    RunStats, build_controller, load_configuration, print_summary, run_variables, setup_logging,
};
use crate::config::QcConfig;
use crate::constants::DEFAULT_REPORT_FILE;
use crate::models::{MeteoVariable, Station};
use crate::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the check command
pub async fn run_check(args: CheckArgs) -> Result<RunStats> {
    setup_logging(&args.input)?;
    info!("Starting spatial QC check");

    args.input.validate()?;

    let mut config = load_configuration(&args.input)?;
    if args.no_spatial {
        config = config.with_check_spatial(false);
    }
    config.validate()?;

    if let Some(output) = &args.output {
        std::fs::create_dir_all(output)?;
    }

    let stats = execute_check(&args.input, config, args.output.clone()).await?;
    print_summary(&stats, &args.input);
    Ok(stats)
}

async fn execute_check(
    input: &InputArgs,
    config: QcConfig,
    output: Option<PathBuf>,
) -> Result<RunStats> {
    let time = input.time;
    run_variables(input, move |stations, variable| {
        check_variable(stations, &config, variable, time, output.as_deref())
    })
    .await
}

/// Check one variable and stage its surviving observations
fn check_variable(
    stations: &mut [Station],
    config: &QcConfig,
    variable: MeteoVariable,
    time: DateTime<Utc>,
    output: Option<&Path>,
) -> Result<QcReport> {
    let mut controller = build_controller(config);
    let mut settings = config.interpolation.clone();
    let mut points = Vec::new();

    let report = controller.check_and_pass_data_to_interpolation(
        stations,
        variable,
        time,
        &mut settings,
        &mut points,
    )?;

    if let Some(dir) = output {
        let path = report_path(dir, variable);
        write_qc_report(&path, stations, variable)?;
        info!("Wrote QC report for {} to {}", variable, path.display());
    }

    Ok(report)
}

/// Per-variable report file inside the output directory
pub fn report_path(dir: &Path, variable: MeteoVariable) -> PathBuf {
    dir.join(format!("{}_{}", variable.name(), DEFAULT_REPORT_FILE))
}
