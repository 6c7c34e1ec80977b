//! Acceptance thresholds for spatial outlier decisions
//!
//! Each variable family has its own envelope built from the local standard
//! deviation, the distance to the closest neighbour and the mean elevation
//! difference to the neighbours. A residual whose magnitude exceeds the
//! envelope marks the station as spatially inconsistent.

use crate::config::MeteoSettings;
use crate::constants::threshold::*;
use crate::models::{MeteoVariable, VariableFamily};

/// Inputs shared by every threshold policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdInputs {
    /// Observed value at the station
    pub value: f64,
    /// Neighbourhood standard deviation
    pub std_dev: f64,
    /// Standard deviation multiplier
    pub nr_std_dev: f64,
    /// Mean absolute elevation difference to the neighbours (m)
    pub avg_delta_z: f64,
    /// Distance to the closest neighbour (m)
    pub min_distance: f64,
}

type ThresholdPolicy = fn(&ThresholdInputs, &MeteoSettings) -> f64;

/// Policy table keyed by variable family
fn policy_for(family: VariableFamily) -> ThresholdPolicy {
    match family {
        VariableFamily::Precipitation => precipitation_threshold,
        VariableFamily::Temperature => temperature_threshold,
        VariableFamily::RelativeHumidity => relative_humidity_threshold,
        VariableFamily::WindIntensity => wind_intensity_threshold,
        VariableFamily::Irradiance => irradiance_threshold,
        VariableFamily::DailyRadiation => daily_radiation_threshold,
        VariableFamily::Transmissivity => transmissivity_threshold,
        VariableFamily::WindDirection | VariableFamily::Derived | VariableFamily::Other => {
            default_threshold
        }
    }
}

/// Compute the acceptance threshold for a residual
///
/// # Arguments
///
/// * `variable` - Variable under control; selects the policy by family
/// * `meteo_settings` - Provides the rainfall threshold
/// * `value` - Observed value at the station
/// * `std_dev` - Neighbourhood standard deviation
/// * `nr_std_dev` - Multiplier (2 to nominate, 3 to confirm)
/// * `avg_delta_z` - Mean elevation difference to the neighbours (m)
/// * `min_distance` - Distance to the closest neighbour (m)
pub fn find_threshold(
    variable: MeteoVariable,
    meteo_settings: &MeteoSettings,
    value: f64,
    std_dev: f64,
    nr_std_dev: f64,
    avg_delta_z: f64,
    min_distance: f64,
) -> f64 {
    let inputs = ThresholdInputs {
        value,
        std_dev,
        nr_std_dev,
        avg_delta_z,
        min_distance,
    };
    policy_for(variable.family())(&inputs, meteo_settings)
}

// Dry reports are never flagged
fn precipitation_threshold(inputs: &ThresholdInputs, meteo: &MeteoSettings) -> f64 {
    if inputs.value <= meteo.rainfall_threshold {
        return DRY_PRECIPITATION_BYPASS;
    }
    let distance_weight =
        (inputs.min_distance / PRECIPITATION_DISTANCE_DIVISOR).max(PRECIPITATION_MIN_DISTANCE_WEIGHT);
    (distance_weight + inputs.std_dev * (inputs.nr_std_dev + 1.0)).max(PRECIPITATION_MIN_THRESHOLD)
}

fn temperature_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    let elevation_weight = inputs.avg_delta_z / TEMPERATURE_ELEVATION_DIVISOR;
    let distance_weight = inputs.min_distance / TEMPERATURE_DISTANCE_DIVISOR;
    let geometry = (distance_weight + TEMPERATURE_BASE + elevation_weight).min(TEMPERATURE_GEOMETRY_CAP);
    (geometry + inputs.std_dev * inputs.nr_std_dev).min(TEMPERATURE_CAP)
}

fn relative_humidity_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    let elevation_weight = inputs.avg_delta_z / REL_HUMIDITY_ELEVATION_DIVISOR;
    let distance_weight = inputs.min_distance / REL_HUMIDITY_DISTANCE_DIVISOR;
    REL_HUMIDITY_BASE + elevation_weight + distance_weight + inputs.std_dev * inputs.nr_std_dev
}

fn wind_intensity_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    let elevation_weight = inputs.avg_delta_z / WIND_ELEVATION_DIVISOR;
    let distance_weight = inputs.min_distance / WIND_DISTANCE_DIVISOR;
    WIND_BASE + elevation_weight + distance_weight + inputs.std_dev * inputs.nr_std_dev
}

fn irradiance_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    let distance_weight = inputs.min_distance / RADIATION_DISTANCE_DIVISOR;
    IRRADIANCE_BASE + distance_weight + inputs.std_dev * (inputs.nr_std_dev + 1.0)
}

fn daily_radiation_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    let distance_weight = inputs.min_distance / RADIATION_DISTANCE_DIVISOR;
    DAILY_RADIATION_BASE + distance_weight + inputs.std_dev * (inputs.nr_std_dev + 1.0)
}

fn transmissivity_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    (inputs.std_dev * inputs.nr_std_dev).max(TRANSMISSIVITY_MIN_THRESHOLD)
}

fn default_threshold(inputs: &ThresholdInputs, _meteo: &MeteoSettings) -> f64 {
    inputs.std_dev * inputs.nr_std_dev
}
