//! Interpolation backend seam
//!
//! The spatial QC pipeline never estimates values itself. It stages points,
//! then asks an [`Interpolator`] to detrend them, estimate values at station
//! coordinates and describe the local neighbourhood. Any geostatistical
//! engine can be plugged in; [`InverseDistanceInterpolator`] is the
//! reference implementation shipped with the crate.
//!
//! [`InverseDistanceInterpolator`]: crate::app::services::reference_interpolator::InverseDistanceInterpolator

use crate::Result;
use crate::config::{InterpolationSettings, MeteoSettings};
use crate::models::{
    ClimateParameters, InterpolationDataPoint, MacroArea, MeteoVariable, Station,
};
use chrono::{DateTime, Utc};

/// Per-cycle context shared by every backend call
#[derive(Debug, Clone, Copy)]
pub struct QcContext<'a> {
    pub variable: MeteoVariable,
    pub time: DateTime<Utc>,
    pub meteo: &'a MeteoSettings,
    pub climate: &'a ClimateParameters,
}

impl<'a> QcContext<'a> {
    pub fn new(
        variable: MeteoVariable,
        time: DateTime<Utc>,
        meteo: &'a MeteoSettings,
        climate: &'a ClimateParameters,
    ) -> Self {
        Self {
            variable,
            time,
            meteo,
            climate,
        }
    }
}

/// Coordinates and covariates at which a value is estimated
#[derive(Debug, Clone, Copy)]
pub struct EstimationTarget<'a> {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub proxy_values: &'a [Option<f64>],
}

impl<'a> EstimationTarget<'a> {
    /// Target located at a station, carrying the station's own proxies
    pub fn at_station(station: &'a Station) -> Self {
        Self {
            x: station.point.utm_x,
            y: station.point.utm_y,
            z: station.point.z,
            proxy_values: &station.proxy_values,
        }
    }
}

/// Local variability around a target coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourhoodStats {
    /// Standard deviation of neighbour values
    pub std_dev: f64,
    /// Mean absolute elevation difference (m) between target and neighbours
    pub avg_delta_z: f64,
    /// Distance (m) to the closest neighbour
    pub min_distance: f64,
}

/// Estimator and detrending collaborator of the spatial QC pipeline
pub trait Interpolator {
    /// Fit the proxy trend (regression, lapse rates) for a point set
    ///
    /// The fitted trend is kept by the backend and used by subsequent
    /// `interpolate` calls. Failures carry the backend's own message as
    /// [`Error::Preprocessing`](crate::Error::Preprocessing).
    fn pre_interpolation(
        &mut self,
        points: &mut [InterpolationDataPoint],
        stations: &[Station],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
    ) -> Result<()>;

    /// Estimate the variable at a target; `None` when no estimate is possible
    fn interpolate(
        &self,
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
        target: &EstimationTarget<'_>,
        use_retrend: bool,
    ) -> Option<f64>;

    /// Subset of `points` local to `(x, y)`
    fn local_selection(
        &self,
        points: &[InterpolationDataPoint],
        x: f64,
        y: f64,
        settings: &InterpolationSettings,
        use_secondary_radius: bool,
    ) -> Vec<InterpolationDataPoint>;

    /// Neighbourhood statistics at a target; `None` with too few neighbours
    fn neighbourhood_variability(
        &self,
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
        target: &EstimationTarget<'_>,
        neighbour_count: usize,
    ) -> Option<NeighbourhoodStats>;

    /// Detrend the points belonging to one macro area, returning its point set
    fn macro_area_detrending(
        &mut self,
        area: &MacroArea,
        stations: &[Station],
        points: &[InterpolationDataPoint],
        settings: &InterpolationSettings,
        context: &QcContext<'_>,
    ) -> Vec<InterpolationDataPoint>;
}
