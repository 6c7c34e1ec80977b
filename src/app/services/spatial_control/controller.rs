use super::cross_validation::compute_error_cross_validation;
use super::gate;
use super::residuals::{
    ResidualFilter, compute_residuals, compute_residuals_glocal,
    compute_residuals_local_detrending,
};
use super::staging::pass_data_to_interpolation;
use super::stats::QcReport;
use crate::app::interpolation::{Interpolator, QcContext};
use crate::app::services::syntactic_qc::SyntacticQualityControl;
use crate::config::{InterpolationSettings, QcConfig, ResidualStrategy};
use crate::models::{InterpolationDataPoint, MacroArea, MeteoVariable, Station};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Spatial quality controller bundling an interpolation backend,
/// a syntactic checker and the QC configuration
///
/// The controller owns its backend, so a single instance serves one
/// variable at a time. Run several controllers to process variables
/// concurrently.
#[derive(Debug)]
pub struct SpatialQualityController<I, Q> {
    interpolator: I,
    syntactic: Q,
    config: QcConfig,
}

impl<I, Q> SpatialQualityController<I, Q>
where
    I: Interpolator,
    Q: SyntacticQualityControl,
{
    pub fn new(interpolator: I, syntactic: Q, config: QcConfig) -> Self {
        Self {
            interpolator,
            syntactic,
            config,
        }
    }

    /// Run syntactic and spatial QC for one variable at one time step
    pub fn check_data(
        &mut self,
        stations: &mut [Station],
        variable: MeteoVariable,
        time: DateTime<Utc>,
    ) -> Result<QcReport> {
        let context = QcContext::new(variable, time, &self.config.meteo, &self.config.climate);

        let outcome = gate::check_data(
            &self.syntactic,
            &mut self.interpolator,
            stations,
            &mut self.config.interpolation,
            &self.config.spatial,
            &context,
        )?;

        let report = QcReport::from_stations(variable, stations, outcome);
        debug!("{}", report.summary());
        Ok(report)
    }

    /// Run QC, then stage the accepted values into `points`
    ///
    /// `settings` are the settings of the interpolation run that will
    /// consume `points`; their extent fields are updated here.
    pub fn check_and_pass_data_to_interpolation(
        &mut self,
        stations: &mut [Station],
        variable: MeteoVariable,
        time: DateTime<Utc>,
        settings: &mut InterpolationSettings,
        points: &mut Vec<InterpolationDataPoint>,
    ) -> Result<QcReport> {
        let context = QcContext::new(variable, time, &self.config.meteo, &self.config.climate);

        let outcome = gate::check_and_pass_data_to_interpolation(
            &self.syntactic,
            &mut self.interpolator,
            stations,
            &mut self.config.interpolation,
            settings,
            &self.config.spatial,
            &context,
            points,
        )?;

        let report =
            QcReport::from_stations(variable, stations, outcome).with_staged_points(points.len());
        info!("{}", report.summary());
        Ok(report)
    }

    /// Run QC, then compute cross-validation residuals with the configured strategy
    ///
    /// `areas` are only used by the glocal strategy.
    ///
    /// # Errors
    ///
    /// Fails when the glocal strategy is given no macro area, when no
    /// admissible point survives QC, or when a detrend fails.
    pub fn cross_validate(
        &mut self,
        stations: &mut [Station],
        variable: MeteoVariable,
        time: DateTime<Utc>,
        areas: &[MacroArea],
    ) -> Result<QcReport> {
        if self.config.spatial.residual_strategy == ResidualStrategy::Glocal && areas.is_empty() {
            return Err(Error::configuration(
                "Glocal residual strategy requires macro areas",
            ));
        }

        let context = QcContext::new(variable, time, &self.config.meteo, &self.config.climate);
        let settings = &mut self.config.interpolation;

        let outcome = gate::check_data(
            &self.syntactic,
            &mut self.interpolator,
            stations,
            settings,
            &self.config.spatial,
            &context,
        )?;

        let mut points = Vec::new();
        if !pass_data_to_interpolation(stations, &mut points, settings) {
            return Err(Error::no_valid_points(variable.name()));
        }

        let filter = ResidualFilter {
            exclude_outside_dem: settings.dem_header.is_some(),
            exclude_supplemental: settings.use_lapse_rate_code,
        };

        match self.config.spatial.residual_strategy {
            ResidualStrategy::Global => {
                self.interpolator
                    .pre_interpolation(&mut points, stations, settings, &context)?;
                compute_residuals(
                    &self.interpolator,
                    stations,
                    &points,
                    settings,
                    &context,
                    filter,
                );
            }
            ResidualStrategy::Local => {
                compute_residuals_local_detrending(
                    &mut self.interpolator,
                    stations,
                    &points,
                    settings,
                    &context,
                    filter,
                )?;
            }
            ResidualStrategy::Glocal => {
                compute_residuals_glocal(
                    &mut self.interpolator,
                    areas,
                    stations,
                    &points,
                    settings,
                    &context,
                    filter,
                )?;
            }
        }

        let mae = compute_error_cross_validation(stations);
        let report = QcReport::from_stations(variable, stations, outcome)
            .with_staged_points(points.len())
            .with_cross_validation(mae);
        info!("{}", report.summary());
        Ok(report)
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    pub fn interpolator(&self) -> &I {
        &self.interpolator
    }
}
