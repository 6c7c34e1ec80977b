//! Reference interpolation backend
//!
//! Inverse distance squared weighting over elevation-detrended values.
//! The trend is a least-squares fit of value against elevation, falling
//! back to the climatological lapse rate for temperatures when the point
//! set is too small or too flat for a regression.

use crate::app::interpolation::{EstimationTarget, Interpolator, NeighbourhoodStats, QcContext};
use crate::config::InterpolationSettings;
use crate::constants::{COINCIDENT_DISTANCE, MIN_ELEVATION_SPREAD};
use crate::models::{
    InterpolationDataPoint, MacroArea, Station, VariableFamily, check_lapse_rate_code,
};
use crate::statistics;
use crate::{Error, Result};
use chrono::Datelike;
use tracing::debug;

/// Linear elevation trend `value = intercept + slope * z`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationTrend {
    pub intercept: f64,
    pub slope: f64,
}

impl ElevationTrend {
    pub fn at(&self, z: f64) -> f64 {
        self.intercept + self.slope * z
    }
}

/// Elevation of a point: the elevation proxy when present, the point height otherwise
fn elevation(proxy_values: &[Option<f64>], settings: &InterpolationSettings, z: f64) -> f64 {
    proxy_values
        .get(settings.elevation_proxy_index)
        .copied()
        .flatten()
        .unwrap_or(z)
}

#[derive(Debug, Clone, Default)]
pub struct InverseDistanceInterpolator {
    trend: Option<ElevationTrend>,
}

impl InverseDistanceInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trend fitted by the last detrend call, if any
    pub fn trend(&self) -> Option<ElevationTrend> {
        self.trend
    }

    fn fit_trend(
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
    ) -> Option<ElevationTrend> {
        let (z, values): (Vec<f64>, Vec<f64>) = points
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                check_lapse_rate_code(
                    p.lapse_rate_code,
                    settings.use_lapse_rate_code,
                    settings.use_supplemental,
                )
            })
            .map(|p| (elevation(&p.proxy_values, settings, p.point.z), p.value))
            .unzip();

        let spread = z.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - z.iter().copied().fold(f64::INFINITY, f64::min);

        if z.len() >= settings.min_regression_points && spread >= MIN_ELEVATION_SPREAD {
            if let Some((intercept, slope)) = statistics::linear_regression(&z, &values) {
                debug!(
                    "Elevation regression over {} points: slope {:.5}",
                    z.len(),
                    slope
                );
                return Some(ElevationTrend { intercept, slope });
            }
        }

        if context.variable.family() != VariableFamily::Temperature {
            return None;
        }

        let slope = context.climate.lapse_rate(context.time.month())?;
        let offsets: Vec<f64> = z
            .iter()
            .zip(&values)
            .map(|(z, value)| value - slope * z)
            .collect();
        let intercept = statistics::mean(&offsets)?;
        Some(ElevationTrend { intercept, slope })
    }

    fn detrended(&self, point: &InterpolationDataPoint, settings: &InterpolationSettings) -> f64 {
        match self.trend {
            Some(trend) => {
                point.value - trend.at(elevation(&point.proxy_values, settings, point.point.z))
            }
            None => point.value,
        }
    }
}

impl Interpolator for InverseDistanceInterpolator {
    fn pre_interpolation(
        &mut self,
        points: &mut [InterpolationDataPoint],
        _stations: &[Station],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
    ) -> Result<()> {
        if !points.iter().any(|p| p.is_active) {
            self.trend = None;
            return Err(Error::preprocessing(format!(
                "no active points to detrend {}",
                context.variable
            )));
        }

        self.trend = Self::fit_trend(points, settings, context);
        Ok(())
    }

    /// With `use_retrend` set, the estimate is the fitted trend alone
    fn interpolate(
        &self,
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        _context: &QcContext<'_>,
        target: &EstimationTarget<'_>,
        use_retrend: bool,
    ) -> Option<f64> {
        let target_z = elevation(target.proxy_values, settings, target.z);

        if use_retrend {
            if let Some(trend) = self.trend {
                return Some(trend.at(target_z));
            }
        }

        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;

        for point in points.iter().filter(|p| p.is_active) {
            let distance = point.point.distance_to(target.x, target.y);
            if distance < COINCIDENT_DISTANCE {
                continue;
            }
            let weight = 1.0 / (distance * distance);
            weight_sum += weight;
            value_sum += weight * self.detrended(point, settings);
        }

        if weight_sum <= 0.0 {
            return None;
        }

        let estimate = value_sum / weight_sum;
        Some(match self.trend {
            Some(trend) => estimate + trend.at(target_z),
            None => estimate,
        })
    }

    fn local_selection(
        &self,
        points: &[InterpolationDataPoint],
        x: f64,
        y: f64,
        settings: &InterpolationSettings,
        use_secondary_radius: bool,
    ) -> Vec<InterpolationDataPoint> {
        let radius = if use_secondary_radius {
            settings.secondary_local_radius
        } else {
            settings.local_radius
        };

        points
            .iter()
            .filter(|p| p.is_active && p.point.distance_to(x, y) <= radius)
            .cloned()
            .collect()
    }

    fn neighbourhood_variability(
        &self,
        points: &[InterpolationDataPoint],
        _settings: &InterpolationSettings,
        _context: &QcContext<'_>,
        target: &EstimationTarget<'_>,
        neighbour_count: usize,
    ) -> Option<NeighbourhoodStats> {
        let mut neighbours: Vec<(f64, &InterpolationDataPoint)> = points
            .iter()
            .filter(|p| p.is_active)
            .map(|p| (p.point.distance_to(target.x, target.y), p))
            .filter(|(distance, _)| *distance >= COINCIDENT_DISTANCE)
            .collect();

        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbours.truncate(neighbour_count);

        if neighbours.len() < 2 {
            return None;
        }

        let values: Vec<f64> = neighbours.iter().map(|(_, p)| p.value).collect();
        let delta_z: Vec<f64> = neighbours
            .iter()
            .map(|(_, p)| (p.point.z - target.z).abs())
            .collect();

        Some(NeighbourhoodStats {
            std_dev: statistics::std_dev(&values)?,
            avg_delta_z: statistics::mean(&delta_z)?,
            min_distance: neighbours[0].0,
        })
    }

    fn macro_area_detrending(
        &mut self,
        area: &MacroArea,
        _stations: &[Station],
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
    ) -> Vec<InterpolationDataPoint> {
        let area_points: Vec<InterpolationDataPoint> = points
            .iter()
            .filter(|p| area.stations.contains(&p.index))
            .cloned()
            .collect();

        self.trend = Self::fit_trend(&area_points, settings, context);
        debug!(
            "Macro area {}: {} points, trend {:?}",
            area.name,
            area_points.len(),
            self.trend
        );
        area_points
    }
}
