//! Residual engines
//!
//! Each engine writes `observed - estimated` onto every eligible station.
//! They differ only in which point set the estimate comes from:
//! - global: the full staged set, detrended once by the caller
//! - local: a neighbourhood subset, detrended per station
//! - glocal: one detrend per macro area, blended by DEM cell weights

use crate::app::interpolation::{EstimationTarget, Interpolator, QcContext};
use crate::config::{InterpolationSettings, MeteoSettings};
use crate::models::{
    InterpolationDataPoint, MacroArea, MeteoVariable, Station, check_lapse_rate_code,
};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Optional eligibility filters applied on top of "active and accepted"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResidualFilter {
    /// Skip stations outside the DEM
    pub exclude_outside_dem: bool,
    /// Skip stations whose lapse-rate code is not admissible
    pub exclude_supplemental: bool,
}

impl ResidualFilter {
    /// Check whether a station is eligible for residual computation
    pub fn is_eligible(&self, station: &Station, settings: &InterpolationSettings) -> bool {
        if !station.active || !station.is_accepted() {
            return false;
        }
        if self.exclude_supplemental
            && !check_lapse_rate_code(station.lapse_rate_code, settings.use_lapse_rate_code, false)
        {
            return false;
        }
        !(self.exclude_outside_dem && !station.is_inside_dem)
    }
}

/// Zero precipitation values below the rainfall threshold
fn clamp_dry(variable: MeteoVariable, meteo: &MeteoSettings, value: Option<f64>) -> Option<f64> {
    value.map(|v| {
        if variable.is_precipitation() && v < meteo.rainfall_threshold {
            0.0
        } else {
            v
        }
    })
}

/// Residual with the precipitation dry clamp applied to both sides
fn clamped_residual(
    context: &QcContext<'_>,
    observed: Option<f64>,
    estimated: Option<f64>,
) -> Option<f64> {
    let observed = clamp_dry(context.variable, context.meteo, observed)?;
    let estimated = clamp_dry(context.variable, context.meteo, estimated)?;
    Some(observed - estimated)
}

/// Compute residuals against the full staged point set
///
/// The caller is expected to have run `pre_interpolation` on `points`.
/// Ineligible stations end with `residual = None`, as do stations whose
/// observed or estimated value is unavailable.
pub fn compute_residuals<I: Interpolator + ?Sized>(
    interpolator: &I,
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    context: &QcContext<'_>,
    filter: ResidualFilter,
) {
    let mut computed = 0;

    for station in stations.iter_mut() {
        station.residual = None;

        if !filter.is_eligible(station, settings) {
            continue;
        }

        let estimated = interpolator.interpolate(
            points,
            settings,
            context,
            &EstimationTarget::at_station(station),
            false,
        );

        station.residual = clamped_residual(context, station.current_value, estimated);
        if station.residual.is_some() {
            computed += 1;
        }
    }

    debug!(
        "Computed {} global residuals for {} stations",
        computed,
        stations.len()
    );
}

/// Compute residuals with a local detrend around every station
///
/// # Errors
///
/// Returns the backend's preprocessing error as soon as the detrend of any
/// local subset fails; residuals already written are left in place.
pub fn compute_residuals_local_detrending<I: Interpolator + ?Sized>(
    interpolator: &mut I,
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    context: &QcContext<'_>,
    filter: ResidualFilter,
) -> Result<()> {
    for index in 0..stations.len() {
        stations[index].residual = None;

        if !filter.is_eligible(&stations[index], settings) {
            continue;
        }

        let (x, y) = (stations[index].point.utm_x, stations[index].point.utm_y);
        let mut subset = interpolator.local_selection(points, x, y, settings, false);

        interpolator
            .pre_interpolation(&mut subset, stations, settings, context)
            .inspect_err(|e| {
                warn!(
                    "Local detrending failed at station {}: {}",
                    stations[index].id, e
                )
            })?;

        let station = &stations[index];
        let estimated = interpolator.interpolate(
            &subset,
            settings,
            context,
            &EstimationTarget::at_station(station),
            false,
        );
        let residual = clamped_residual(context, station.current_value, estimated);

        stations[index].residual = residual;
    }

    Ok(())
}

/// Accumulate weighted residuals for one macro area
///
/// The area is detrended once; each member station then contributes
/// `(observed - estimated) * weight`, where the weight is the area's
/// influence at the station's DEM cell. Contributions add onto any residual
/// already present, so a station in several overlapping areas ends with the
/// weighted sum over all of them.
///
/// # Errors
///
/// Fails when the settings carry no DEM header.
pub fn compute_residuals_glocal_detrending<I: Interpolator + ?Sized>(
    interpolator: &mut I,
    area: &MacroArea,
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    context: &QcContext<'_>,
    filter: ResidualFilter,
) -> Result<()> {
    let dem_header = settings
        .dem_header
        .ok_or_else(|| Error::configuration("Glocal detrending requires a DEM header"))?;

    let area_points = interpolator.macro_area_detrending(area, stations, points, settings, context);

    for &index in &area.stations {
        let Some(station) = stations.get(index) else {
            warn!(
                "Macro area {} references station index {} out of range",
                area.name, index
            );
            continue;
        };

        if !filter.is_eligible(station, settings) {
            continue;
        }

        let weight = dem_header
            .cell_index(station.point.utm_x, station.point.utm_y)
            .and_then(|cell| area.weight_at(cell));
        let Some(weight) = weight else {
            debug!(
                "Station {} has no weight in macro area {}",
                station.id, area.name
            );
            continue;
        };

        let estimated = interpolator.interpolate(
            &area_points,
            settings,
            context,
            &EstimationTarget::at_station(station),
            false,
        );

        if let (Some(observed), Some(estimated)) = (station.current_value, estimated) {
            let contribution = (observed - estimated) * weight;
            let station = &mut stations[index];
            station.residual = Some(station.residual.unwrap_or(0.0) + contribution);
        }
    }

    Ok(())
}

/// Compute glocal residuals over every macro area
///
/// Clears all residuals, then folds each area in turn.
pub fn compute_residuals_glocal<I: Interpolator + ?Sized>(
    interpolator: &mut I,
    areas: &[MacroArea],
    stations: &mut [Station],
    points: &[InterpolationDataPoint],
    settings: &InterpolationSettings,
    context: &QcContext<'_>,
    filter: ResidualFilter,
) -> Result<()> {
    for station in stations.iter_mut() {
        station.residual = None;
    }

    for area in areas {
        compute_residuals_glocal_detrending(
            interpolator,
            area,
            stations,
            points,
            settings,
            context,
            filter,
        )?;
    }

    debug!("Computed glocal residuals over {} macro areas", areas.len());
    Ok(())
}
