//! Test utilities and mock infrastructure for spatial quality control
//!
//! Provides station fixtures, a hand-checkable five-station network and a
//! scriptable interpolation backend.

use chrono::{DateTime, TimeZone, Utc};
use std::cell::Cell;

use crate::app::interpolation::{EstimationTarget, Interpolator, NeighbourhoodStats, QcContext};
use crate::config::{InterpolationSettings, MeteoSettings};
use crate::constants::COINCIDENT_DISTANCE;
use crate::models::{
    ClimateParameters, GeoPoint, InterpolationDataPoint, MacroArea, MeteoVariable, Quality,
    Station,
};
use crate::{Error, Result};

// Test modules
mod cross_validation_tests;
mod threshold_tests;

/// Fixed time step used by every fixture
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

/// Create an active, accepted station carrying `value` as its current value
pub fn create_test_station(id: &str, x: f64, y: f64, z: f64, value: f64) -> Station {
    let mut station = Station::new(id, format!("Station {id}"), GeoPoint::new(x, y, z));
    station.proxy_values = vec![Some(z)];
    station.current_value = Some(value);
    station.quality = Quality::Accepted;
    station
}

/// Five stations on a flat plain: one warm outlier at the centre, four
/// neighbours 1 km away in each cardinal direction
pub fn create_five_station_network() -> Vec<Station> {
    vec![
        create_test_station("S0", 0.0, 0.0, 100.0, 15.0),
        create_test_station("S1", 1000.0, 0.0, 100.0, 5.0),
        create_test_station("S2", -1000.0, 0.0, 100.0, 5.0),
        create_test_station("S3", 0.0, 1000.0, 100.0, 4.0),
        create_test_station("S4", 0.0, -1000.0, 100.0, 6.0),
    ]
}

/// Same network with the values stored as raw observations at [`test_time`]
pub fn create_observed_network(variable: MeteoVariable) -> Vec<Station> {
    create_five_station_network()
        .into_iter()
        .map(|mut station| {
            if let Some(value) = station.current_value.take() {
                station.add_observation(variable, test_time(), value);
            }
            station.quality = Quality::NotYetChecked;
            station
        })
        .collect()
}

/// Owner of the settings a `QcContext` borrows
#[derive(Debug, Default)]
pub struct TestFixture {
    pub meteo: MeteoSettings,
    pub climate: ClimateParameters,
}

impl TestFixture {
    pub fn context(&self, variable: MeteoVariable) -> QcContext<'_> {
        QcContext::new(variable, test_time(), &self.meteo, &self.climate)
    }
}

/// Scriptable interpolation backend
///
/// Estimates are the plain mean of the non-coincident points, so every
/// estimate is a leave-one-out estimate. Neighbourhood statistics are
/// fixed by the test.
#[derive(Debug, Default)]
pub struct MockInterpolator {
    /// Statistics returned for every target; `None` means unavailable
    pub stats: Option<NeighbourhoodStats>,
    /// Number of estimates served before returning `None`
    pub max_estimates: Option<usize>,
    /// `pre_interpolation` call (1-based) that fails
    pub fail_preprocessing_on_call: Option<usize>,
    pub pre_interpolation_calls: usize,
    pub estimate_calls: Cell<usize>,
    pub detrended_areas: Vec<String>,
}

impl MockInterpolator {
    pub fn with_stats(std_dev: f64, avg_delta_z: f64, min_distance: f64) -> Self {
        Self {
            stats: Some(NeighbourhoodStats {
                std_dev,
                avg_delta_z,
                min_distance,
            }),
            ..Default::default()
        }
    }
}

impl Interpolator for MockInterpolator {
    fn pre_interpolation(
        &mut self,
        _points: &mut [InterpolationDataPoint],
        _stations: &[Station],
        _settings: &InterpolationSettings,
        _context: &QcContext<'_>,
    ) -> Result<()> {
        self.pre_interpolation_calls += 1;
        if self.fail_preprocessing_on_call == Some(self.pre_interpolation_calls) {
            return Err(Error::preprocessing("singular regression matrix"));
        }
        Ok(())
    }

    fn interpolate(
        &self,
        points: &[InterpolationDataPoint],
        _settings: &InterpolationSettings,
        _context: &QcContext<'_>,
        target: &EstimationTarget<'_>,
        _use_retrend: bool,
    ) -> Option<f64> {
        let served = self.estimate_calls.get();
        self.estimate_calls.set(served + 1);
        if self.max_estimates.is_some_and(|max| served >= max) {
            return None;
        }

        let values: Vec<f64> = points
            .iter()
            .filter(|p| p.is_active && p.point.distance_to(target.x, target.y) >= COINCIDENT_DISTANCE)
            .map(|p| p.value)
            .collect();
        crate::statistics::mean(&values)
    }

    fn local_selection(
        &self,
        points: &[InterpolationDataPoint],
        x: f64,
        y: f64,
        settings: &InterpolationSettings,
        _use_secondary_radius: bool,
    ) -> Vec<InterpolationDataPoint> {
        points
            .iter()
            .filter(|p| p.point.distance_to(x, y) <= settings.local_radius)
            .cloned()
            .collect()
    }

    fn neighbourhood_variability(
        &self,
        _points: &[InterpolationDataPoint],
        _settings: &InterpolationSettings,
        _context: &QcContext<'_>,
        _target: &EstimationTarget<'_>,
        _neighbour_count: usize,
    ) -> Option<NeighbourhoodStats> {
        self.stats
    }

    fn macro_area_detrending(
        &mut self,
        area: &MacroArea,
        _stations: &[Station],
        points: &[InterpolationDataPoint],
        _settings: &InterpolationSettings,
        _context: &QcContext<'_>,
    ) -> Vec<InterpolationDataPoint> {
        self.detrended_areas.push(area.name.clone());
        points
            .iter()
            .filter(|p| area.stations.contains(&p.index))
            .cloned()
            .collect()
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
