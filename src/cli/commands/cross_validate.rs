//! Cross-validate command implementation

use crate::cli::args::{CrossValidateArgs, InputArgs};
use crate::cli::commands::shared::{
    RunStats, build_controller, load_configuration, print_summary, run_variables, setup_logging,
};
use crate::config::{QcConfig, ResidualStrategy};
use crate::{Error, Result};
use tracing::info;

/// Run the cross-validate command
pub async fn run_cross_validate(args: CrossValidateArgs) -> Result<RunStats> {
    setup_logging(&args.input)?;
    info!("Starting spatial QC cross-validation");

    args.input.validate()?;

    let mut config = load_configuration(&args.input)?;
    if let Some(strategy) = args.strategy {
        config = config.with_residual_strategy(strategy.into());
    }
    config.validate()?;
    ensure_strategy_available(&config)?;
    info!(
        "Residual strategy: {:?}",
        config.spatial.residual_strategy
    );

    let stats = execute_cross_validation(&args.input, config).await?;
    print_summary(&stats, &args.input);
    Ok(stats)
}

/// The command line has no way to define macro areas
fn ensure_strategy_available(config: &QcConfig) -> Result<()> {
    if config.spatial.residual_strategy == ResidualStrategy::Glocal {
        return Err(Error::configuration(
            "Glocal residual strategy needs macro areas and is not available from the command line; \
             use --strategy global or --strategy local",
        ));
    }
    Ok(())
}

async fn execute_cross_validation(input: &InputArgs, config: QcConfig) -> Result<RunStats> {
    let time = input.time;
    run_variables(input, move |stations, variable| {
        // Macro areas are not available from the command line
        build_controller(&config).cross_validate(stations, variable, time, &[])
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::shared::test_support::{input_args, network_files};
    use crate::models::{DemHeader, MeteoVariable};

    #[tokio::test]
    async fn test_cross_validation_error_reported() {
        let (stations, observations) = network_files();
        let input = input_args(stations.path(), observations.path(), "air-temperature");

        for strategy in [ResidualStrategy::Global, ResidualStrategy::Local] {
            let config = QcConfig::default().with_residual_strategy(strategy);
            let stats = execute_cross_validation(&input, config).await.unwrap();

            let report = stats.report(MeteoVariable::AirTemperature).unwrap();
            assert_eq!(report.wrong_spatial, 1);
            // S1 and S2 exact, S3 and S4 off by 1.2
            let mae = report.cross_validation_mae.unwrap();
            assert!((mae - 0.6).abs() < 1e-9, "{strategy:?}: {mae}");
        }
    }

    #[tokio::test]
    async fn test_cross_validation_without_points_fails_per_variable() {
        let (stations, observations) = network_files();
        let input = input_args(stations.path(), observations.path(), "air-rel-humidity");

        let stats = execute_cross_validation(&input, QcConfig::default())
            .await
            .unwrap();

        assert!(stats.reports.is_empty());
        assert_eq!(stats.failures[0].0, MeteoVariable::AirRelHumidity);
    }

    #[test]
    fn test_glocal_rejected_from_command_line() {
        let header = DemHeader {
            n_rows: 10,
            n_cols: 10,
            cell_size: 1000.0,
            ll_corner_x: -5000.0,
            ll_corner_y: -5000.0,
        };
        let config = QcConfig::default()
            .with_residual_strategy(ResidualStrategy::Glocal)
            .with_dem_header(header);
        // Valid as a library configuration
        assert!(config.validate().is_ok());

        let result = ensure_strategy_available(&config);
        assert!(matches!(result, Err(Error::Configuration { .. })));

        for strategy in [ResidualStrategy::Global, ResidualStrategy::Local] {
            let config = QcConfig::default().with_residual_strategy(strategy);
            assert!(ensure_strategy_available(&config).is_ok());
        }
    }
}
