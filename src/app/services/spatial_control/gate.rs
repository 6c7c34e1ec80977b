//! Per-variable orchestration of quality control
//!
//! Assigns the value under control to every station, runs syntactic QC,
//! then the spatial detector when the variable allows it, and finally
//! stages the accepted set for the interpolation run.

use super::detector::spatial_quality_control;
use super::staging::pass_data_to_interpolation;
use super::stats::SpatialQcOutcome;
use crate::app::interpolation::{Interpolator, QcContext};
use crate::app::services::syntactic_qc::SyntacticQualityControl;
use crate::config::{InterpolationSettings, SpatialQcConfig};
use crate::models::{InterpolationDataPoint, MeteoVariable, Quality, Station};
use crate::{Error, Result};
use tracing::{debug, info};

/// Copy a pre-computed field into the current value and set quality by availability
fn assign_derived(stations: &mut [Station], field: impl Fn(&Station) -> Option<f64>) {
    for station in stations.iter_mut() {
        station.current_value = field(station);
        station.quality = if station.current_value.is_some() {
            Quality::Accepted
        } else {
            Quality::MissingData
        };
    }
}

/// Assign values and run quality control for one variable at one time step
///
/// Elaboration and anomaly variables take the pre-computed station field
/// and skip all checks. Raw variables are read from the station time
/// series, always go through syntactic QC and, when `spatial.check_spatial`
/// is set and the variable is neither precipitation nor wind direction,
/// through the spatial detector.
///
/// # Returns
///
/// The spatial detector outcome, or `None` when it did not run
///
/// # Errors
///
/// Fails on an empty station array or a detrend failure.
pub fn check_data<I, Q>(
    syntactic: &Q,
    interpolator: &mut I,
    stations: &mut [Station],
    settings: &mut InterpolationSettings,
    spatial: &SpatialQcConfig,
    context: &QcContext<'_>,
) -> Result<Option<SpatialQcOutcome>>
where
    I: Interpolator + ?Sized,
    Q: SyntacticQualityControl + ?Sized,
{
    if stations.is_empty() {
        return Err(Error::NoStations);
    }

    match context.variable {
        MeteoVariable::Elaboration => {
            assign_derived(stations, |station| station.elaboration);
            return Ok(None);
        }
        MeteoVariable::Anomaly => {
            assign_derived(stations, |station| station.anomaly);
            return Ok(None);
        }
        variable => {
            for station in stations.iter_mut() {
                station.current_value = station.value_at(context.time, variable);
            }
        }
    }

    syntactic.syntactic_quality_control(context.variable, stations);

    if !spatial.check_spatial || !context.variable.supports_spatial_check() {
        debug!(
            "Spatial QC not applied to {} (enabled: {})",
            context.variable, spatial.check_spatial
        );
        return Ok(None);
    }

    spatial_quality_control(interpolator, stations, settings, spatial, context).map(Some)
}

/// Run quality control, then stage the accepted values for interpolation
///
/// `qc_settings` drive the spatial detector's own interpolation runs;
/// `interpolation_settings` receive the extent of the final point set.
///
/// # Errors
///
/// Besides the errors of [`check_data`], returns
/// [`Error::NoValidPoints`] when no admissible point is left to interpolate.
#[allow(clippy::too_many_arguments)]
pub fn check_and_pass_data_to_interpolation<I, Q>(
    syntactic: &Q,
    interpolator: &mut I,
    stations: &mut [Station],
    qc_settings: &mut InterpolationSettings,
    interpolation_settings: &mut InterpolationSettings,
    spatial: &SpatialQcConfig,
    context: &QcContext<'_>,
    points: &mut Vec<InterpolationDataPoint>,
) -> Result<Option<SpatialQcOutcome>>
where
    I: Interpolator + ?Sized,
    Q: SyntacticQualityControl + ?Sized,
{
    let outcome = check_data(syntactic, interpolator, stations, qc_settings, spatial, context)?;

    if !pass_data_to_interpolation(stations, points, interpolation_settings) {
        return Err(Error::no_valid_points(context.variable.name()));
    }

    info!(
        "Passed {} points of {} to interpolation",
        points.len(),
        context.variable
    );

    Ok(outcome)
}
