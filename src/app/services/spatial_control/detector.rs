//! Two-pass spatial outlier detection
//!
//! Detection nominates stations whose residual exceeds a loose envelope
//! while they are still part of their own neighbourhood. Verification
//! removes the nominees from the point set, re-estimates them from the
//! remaining stations and confirms only those beyond a stricter envelope.

use super::residuals::{ResidualFilter, compute_residuals};
use super::staging::pass_data_to_interpolation;
use super::stats::SpatialQcOutcome;
use super::threshold::find_threshold;
use crate::Result;
use crate::app::interpolation::{EstimationTarget, Interpolator, QcContext};
use crate::config::{InterpolationSettings, SpatialQcConfig};
use crate::constants::STD_DEV_VALUE_FLOOR_DIVISOR;
use crate::models::{InterpolationDataPoint, Quality, Station};
use tracing::{debug, info, warn};

/// Run spatial quality control over the station array
///
/// Stations in `Accepted` state are tested; every other state is left as
/// found. Flagged stations end in `WrongSpatial`, reinstated ones in
/// `Accepted`.
///
/// If the initial staging finds no admissible point the call is a no-op.
/// If re-staging finds none after nominations, the nominees stay flagged
/// without verification (reported through [`SpatialQcOutcome::unverified`]).
///
/// # Errors
///
/// Propagates the backend's preprocessing error from either detrend.
pub fn spatial_quality_control<I: Interpolator + ?Sized>(
    interpolator: &mut I,
    stations: &mut [Station],
    settings: &mut InterpolationSettings,
    config: &SpatialQcConfig,
    context: &QcContext<'_>,
) -> Result<SpatialQcOutcome> {
    let mut points: Vec<InterpolationDataPoint> = Vec::new();

    if !pass_data_to_interpolation(stations, &mut points, settings) {
        debug!(
            "Spatial QC for {} skipped: no admissible points",
            context.variable
        );
        return Ok(SpatialQcOutcome::not_staged());
    }

    interpolator.pre_interpolation(&mut points, stations, settings, context)?;

    compute_residuals(
        &*interpolator,
        stations,
        &points,
        settings,
        context,
        ResidualFilter::default(),
    );

    let nominated = detect(&*interpolator, stations, &points, settings, config, context);

    let mut outcome = SpatialQcOutcome {
        staged: true,
        nominated,
        ..Default::default()
    };

    if outcome.nominated.is_empty() {
        info!(
            "Spatial QC for {}: no outliers among {} points",
            context.variable,
            points.len()
        );
        return Ok(outcome);
    }

    // Nominees are no longer accepted, so re-staging leaves them out
    if !pass_data_to_interpolation(stations, &mut points, settings) {
        warn!(
            "Spatial QC for {}: no admissible points left after flagging {} stations, \
             flags kept without verification",
            context.variable,
            outcome.nominated.len()
        );
        return Ok(outcome);
    }

    interpolator.pre_interpolation(&mut points, stations, settings, context)?;

    verify(
        &*interpolator,
        stations,
        &points,
        settings,
        config,
        context,
        &mut outcome,
    );

    info!(
        "Spatial QC for {}: {} nominated, {} confirmed, {} reinstated",
        context.variable,
        outcome.nominated.len(),
        outcome.confirmed.len(),
        outcome.reinstated.len()
    );

    Ok(outcome)
}

/// Detection pass: flag accepted stations beyond the loose envelope
fn detect<I: Interpolator + ?Sized>(
    interpolator: &I,
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    config: &SpatialQcConfig,
    context: &QcContext<'_>,
) -> Vec<usize> {
    let mut nominated = Vec::new();

    for (index, station) in stations.iter_mut().enumerate() {
        if !station.is_accepted() {
            continue;
        }

        let (Some(value), Some(residual)) = (station.current_value, station.residual) else {
            continue;
        };

        let Some(stats) = interpolator.neighbourhood_variability(
            points,
            settings,
            context,
            &EstimationTarget::at_station(station),
            config.neighbour_count,
        ) else {
            continue;
        };

        let std_dev = stats.std_dev.max(value / STD_DEV_VALUE_FLOOR_DIVISOR);
        let threshold = find_threshold(
            context.variable,
            context.meteo,
            value,
            std_dev,
            config.detection_nr_std_dev,
            stats.avg_delta_z,
            stats.min_distance,
        );

        if residual.abs() > threshold {
            debug!(
                "Station {} nominated: |residual| {:.3} > threshold {:.3}",
                station.id,
                residual.abs(),
                threshold
            );
            station.quality = Quality::WrongSpatial;
            nominated.push(index);
        }
    }

    nominated
}

/// Verification pass: re-estimate nominees without them and re-test
fn verify<I: Interpolator + ?Sized>(
    interpolator: &I,
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    config: &SpatialQcConfig,
    context: &QcContext<'_>,
    outcome: &mut SpatialQcOutcome,
) {
    // Estimates first, from the same revised point set for every nominee
    let provisional: Vec<Option<f64>> = outcome
        .nominated
        .iter()
        .map(|&index| {
            let station = &stations[index];
            let estimated = interpolator.interpolate(
                points,
                settings,
                context,
                &EstimationTarget::at_station(station),
                false,
            );
            estimated
                .zip(station.current_value)
                .map(|(estimated, observed)| estimated - observed)
        })
        .collect();

    for (&index, provisional) in outcome.nominated.iter().zip(provisional) {
        let station = &mut stations[index];

        let stats = interpolator.neighbourhood_variability(
            points,
            settings,
            context,
            &EstimationTarget::at_station(station),
            config.neighbour_count,
        );

        let still_wrong = match (stats, provisional, station.current_value) {
            (Some(stats), Some(residual), Some(value)) => {
                let threshold = find_threshold(
                    context.variable,
                    context.meteo,
                    value,
                    stats.std_dev,
                    config.verification_nr_std_dev,
                    stats.avg_delta_z,
                    stats.min_distance,
                );
                residual.abs() > threshold
            }
            _ => false,
        };

        if still_wrong {
            station.quality = Quality::WrongSpatial;
            outcome.confirmed.push(index);
        } else {
            debug!("Station {} reinstated after verification", station.id);
            station.quality = Quality::Accepted;
            outcome.reinstated.push(index);
        }
    }

    outcome.verification_ran = true;
}
