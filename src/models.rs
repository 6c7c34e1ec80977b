//! Core data structures for spatial quality control
//!
//! This module contains the station record, the interpolation point
//! projection built from it, the quality state machine, the variable
//! catalogue and the macro-area / DEM types used by glocal detrending.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Variables
// =============================================================================

/// Meteorological variables handled by the QC pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeteoVariable {
    AirTemperature,
    AirDewTemperature,
    Precipitation,
    AirRelHumidity,
    GlobalIrradiance,
    AtmTransmissivity,
    AtmPressure,
    WindScalarIntensity,
    WindVectorIntensity,
    WindVectorX,
    WindVectorY,
    WindVectorDirection,
    LeafWetness,
    DailyAirTemperatureMin,
    DailyAirTemperatureMax,
    DailyAirTemperatureAvg,
    DailyPrecipitation,
    DailyAirRelHumidityMin,
    DailyAirRelHumidityMax,
    DailyAirRelHumidityAvg,
    DailyGlobalRadiation,
    DailyWindScalarIntensityAvg,
    DailyWindScalarIntensityMax,
    DailyWindVectorIntensityAvg,
    DailyWindVectorIntensityMax,
    DailyWindVectorDirectionPrevailing,
    DailyReferenceEvapotranspiration,
    /// Pre-computed climate elaboration stored on each station
    Elaboration,
    /// Pre-computed anomaly stored on each station
    Anomaly,
}

/// Variable families sharing one threshold policy and one QC treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableFamily {
    Precipitation,
    Temperature,
    RelativeHumidity,
    WindIntensity,
    /// Direction or vector components; never spatially checked
    WindDirection,
    Irradiance,
    DailyRadiation,
    Transmissivity,
    /// Elaboration and anomaly fields computed upstream
    Derived,
    Other,
}

impl MeteoVariable {
    pub const ALL: &'static [MeteoVariable] = &[
        MeteoVariable::AirTemperature,
        MeteoVariable::AirDewTemperature,
        MeteoVariable::Precipitation,
        MeteoVariable::AirRelHumidity,
        MeteoVariable::GlobalIrradiance,
        MeteoVariable::AtmTransmissivity,
        MeteoVariable::AtmPressure,
        MeteoVariable::WindScalarIntensity,
        MeteoVariable::WindVectorIntensity,
        MeteoVariable::WindVectorX,
        MeteoVariable::WindVectorY,
        MeteoVariable::WindVectorDirection,
        MeteoVariable::LeafWetness,
        MeteoVariable::DailyAirTemperatureMin,
        MeteoVariable::DailyAirTemperatureMax,
        MeteoVariable::DailyAirTemperatureAvg,
        MeteoVariable::DailyPrecipitation,
        MeteoVariable::DailyAirRelHumidityMin,
        MeteoVariable::DailyAirRelHumidityMax,
        MeteoVariable::DailyAirRelHumidityAvg,
        MeteoVariable::DailyGlobalRadiation,
        MeteoVariable::DailyWindScalarIntensityAvg,
        MeteoVariable::DailyWindScalarIntensityMax,
        MeteoVariable::DailyWindVectorIntensityAvg,
        MeteoVariable::DailyWindVectorIntensityMax,
        MeteoVariable::DailyWindVectorDirectionPrevailing,
        MeteoVariable::DailyReferenceEvapotranspiration,
        MeteoVariable::Elaboration,
        MeteoVariable::Anomaly,
    ];

    /// Get the family that decides threshold policy and QC treatment
    pub fn family(&self) -> VariableFamily {
        use MeteoVariable::*;
        match self {
            Precipitation | DailyPrecipitation => VariableFamily::Precipitation,
            AirTemperature
            | AirDewTemperature
            | DailyAirTemperatureMax
            | DailyAirTemperatureMin
            | DailyAirTemperatureAvg => VariableFamily::Temperature,
            AirRelHumidity
            | DailyAirRelHumidityMax
            | DailyAirRelHumidityMin
            | DailyAirRelHumidityAvg => VariableFamily::RelativeHumidity,
            WindScalarIntensity
            | WindVectorIntensity
            | DailyWindScalarIntensityAvg
            | DailyWindScalarIntensityMax
            | DailyWindVectorIntensityAvg
            | DailyWindVectorIntensityMax => VariableFamily::WindIntensity,
            WindVectorX | WindVectorY | WindVectorDirection | DailyWindVectorDirectionPrevailing => {
                VariableFamily::WindDirection
            }
            GlobalIrradiance => VariableFamily::Irradiance,
            DailyGlobalRadiation => VariableFamily::DailyRadiation,
            AtmTransmissivity => VariableFamily::Transmissivity,
            Elaboration | Anomaly => VariableFamily::Derived,
            AtmPressure | LeafWetness | DailyReferenceEvapotranspiration => VariableFamily::Other,
        }
    }

    /// Precipitation-like variables get the dry clamp and skip spatial QC
    pub fn is_precipitation(&self) -> bool {
        self.family() == VariableFamily::Precipitation
    }

    /// Whether the spatial consistency check may run for this variable
    pub fn supports_spatial_check(&self) -> bool {
        !matches!(
            self.family(),
            VariableFamily::Precipitation | VariableFamily::WindDirection | VariableFamily::Derived
        )
    }

    /// Canonical kebab-case name, as used on the command line and in CSV files
    pub fn name(&self) -> &'static str {
        use MeteoVariable::*;
        match self {
            AirTemperature => "air-temperature",
            AirDewTemperature => "air-dew-temperature",
            Precipitation => "precipitation",
            AirRelHumidity => "air-rel-humidity",
            GlobalIrradiance => "global-irradiance",
            AtmTransmissivity => "atm-transmissivity",
            AtmPressure => "atm-pressure",
            WindScalarIntensity => "wind-scalar-intensity",
            WindVectorIntensity => "wind-vector-intensity",
            WindVectorX => "wind-vector-x",
            WindVectorY => "wind-vector-y",
            WindVectorDirection => "wind-vector-direction",
            LeafWetness => "leaf-wetness",
            DailyAirTemperatureMin => "daily-air-temperature-min",
            DailyAirTemperatureMax => "daily-air-temperature-max",
            DailyAirTemperatureAvg => "daily-air-temperature-avg",
            DailyPrecipitation => "daily-precipitation",
            DailyAirRelHumidityMin => "daily-air-rel-humidity-min",
            DailyAirRelHumidityMax => "daily-air-rel-humidity-max",
            DailyAirRelHumidityAvg => "daily-air-rel-humidity-avg",
            DailyGlobalRadiation => "daily-global-radiation",
            DailyWindScalarIntensityAvg => "daily-wind-scalar-intensity-avg",
            DailyWindScalarIntensityMax => "daily-wind-scalar-intensity-max",
            DailyWindVectorIntensityAvg => "daily-wind-vector-intensity-avg",
            DailyWindVectorIntensityMax => "daily-wind-vector-intensity-max",
            DailyWindVectorDirectionPrevailing => "daily-wind-vector-direction-prevailing",
            DailyReferenceEvapotranspiration => "daily-reference-evapotranspiration",
            Elaboration => "elaboration",
            Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for MeteoVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeteoVariable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        MeteoVariable::ALL
            .iter()
            .find(|variable| variable.name() == normalized)
            .copied()
            .ok_or_else(|| Error::unknown_variable(s))
    }
}

// =============================================================================
// Quality State
// =============================================================================

/// Quality state of a station's current value
///
/// Only `Accepted` values take part in residual computation and staging.
/// `WrongSpatial` is entered from `Accepted` only, and may be reverted to
/// `Accepted` by the second detector pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    NotYetChecked,
    Accepted,
    MissingData,
    WrongSyntactic,
    WrongSpatial,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::NotYetChecked => "not_yet_checked",
            Quality::Accepted => "accepted",
            Quality::MissingData => "missing_data",
            Quality::WrongSyntactic => "wrong_syntactic",
            Quality::WrongSpatial => "wrong_spatial",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Lapse Rate Classification
// =============================================================================

/// Station classification controlling eligibility for elevation detrending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LapseRateCode {
    #[default]
    Primary,
    Secondary,
    Supplemental,
}

impl FromStr for LapseRateCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "0" => Ok(LapseRateCode::Primary),
            "secondary" | "1" => Ok(LapseRateCode::Secondary),
            "supplemental" | "2" => Ok(LapseRateCode::Supplemental),
            other => Err(Error::data_validation(format!(
                "Invalid lapse rate code '{other}': expected primary, secondary or supplemental"
            ))),
        }
    }
}

/// Lapse-rate admissibility predicate
///
/// With lapse-rate codes disabled every station is admissible. Otherwise
/// supplemental stations are admitted only when `use_supplemental` is set.
pub fn check_lapse_rate_code(
    code: LapseRateCode,
    use_lapse_rate_code: bool,
    use_supplemental: bool,
) -> bool {
    if !use_lapse_rate_code || use_supplemental {
        return true;
    }
    code != LapseRateCode::Supplemental
}

// =============================================================================
// Station
// =============================================================================

/// Station position in projected (UTM) and geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub utm_x: f64,
    pub utm_y: f64,
    /// Elevation above sea level in metres
    pub z: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(utm_x: f64, utm_y: f64, z: f64) -> Self {
        Self {
            utm_x,
            utm_y,
            z,
            ..Default::default()
        }
    }

    /// Planar distance to a UTM coordinate in metres
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.utm_x - x).hypot(self.utm_y - y)
    }
}

/// A meteorological station and its per-cycle QC state
///
/// The caller owns the station array for the lifetime of a run. The QC
/// pipeline overwrites `current_value`, `quality` and `residual` on every
/// pass and never retains references across calls.
#[derive(Debug, Clone, Default)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub point: GeoPoint,

    pub active: bool,
    pub selected: bool,
    pub marked: bool,
    pub is_inside_dem: bool,

    pub lapse_rate_code: LapseRateCode,
    /// Proxy covariates (elevation, distance to coast, ...) by proxy index
    pub proxy_values: Vec<Option<f64>>,
    /// Precomputed topographic distance grid, shared with the interpolation points
    pub topographic_distance: Option<Arc<[f64]>>,

    /// Value under quality control for the current cycle
    pub current_value: Option<f64>,
    pub quality: Quality,
    /// Observed minus estimated value
    pub residual: Option<f64>,

    pub elaboration: Option<f64>,
    pub anomaly: Option<f64>,

    observations: HashMap<MeteoVariable, BTreeMap<DateTime<Utc>, f64>>,
}

impl Station {
    /// Create an active station inside the DEM with no observations
    pub fn new(id: impl Into<String>, name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            point,
            active: true,
            is_inside_dem: true,
            ..Default::default()
        }
    }

    /// Record a raw observation for a variable at a time step
    pub fn add_observation(&mut self, variable: MeteoVariable, time: DateTime<Utc>, value: f64) {
        self.observations
            .entry(variable)
            .or_default()
            .insert(time, value);
    }

    /// Raw observation for a variable at a time step, if recorded
    pub fn value_at(&self, time: DateTime<Utc>, variable: MeteoVariable) -> Option<f64> {
        self.observations
            .get(&variable)
            .and_then(|series| series.get(&time))
            .copied()
            .filter(|value| value.is_finite())
    }

    /// Number of observations recorded for a variable
    pub fn observation_count(&self, variable: MeteoVariable) -> usize {
        self.observations.get(&variable).map_or(0, BTreeMap::len)
    }

    pub fn is_accepted(&self) -> bool {
        self.quality == Quality::Accepted
    }
}

/// True when at least one station is selected; staging then keeps only selected stations
pub fn is_selection_active(stations: &[Station]) -> bool {
    stations.iter().any(|station| station.selected)
}

// =============================================================================
// Interpolation Point
// =============================================================================

/// Projection of one active, accepted station consumed by the estimator
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterpolationDataPoint {
    /// Index of the source station in the caller's station array
    pub index: usize,
    pub value: f64,
    pub point: GeoPoint,
    pub lapse_rate_code: LapseRateCode,
    pub proxy_values: Vec<Option<f64>>,
    pub topographic_distance: Option<Arc<[f64]>>,
    pub is_active: bool,
    pub is_marked: bool,
}

impl InterpolationDataPoint {
    /// Build a point from a station whose current value is known
    pub fn from_station(index: usize, station: &Station, value: f64) -> Self {
        Self {
            index,
            value,
            point: station.point,
            lapse_rate_code: station.lapse_rate_code,
            proxy_values: station.proxy_values.clone(),
            topographic_distance: station.topographic_distance.clone(),
            is_active: true,
            is_marked: station.marked,
        }
    }
}

// =============================================================================
// DEM Header & Macro Areas
// =============================================================================

/// Header of the active elevation raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemHeader {
    pub n_rows: usize,
    pub n_cols: usize,
    pub cell_size: f64,
    /// Lower-left corner in UTM coordinates
    pub ll_corner_x: f64,
    pub ll_corner_y: f64,
}

impl DemHeader {
    /// Row and column of the cell containing `(x, y)`, if inside the grid
    pub fn row_col(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() || self.cell_size <= 0.0 {
            return None;
        }
        let top = self.ll_corner_y + self.n_rows as f64 * self.cell_size;
        let row = ((top - y) / self.cell_size).floor();
        let col = ((x - self.ll_corner_x) / self.cell_size).floor();
        if row < 0.0 || col < 0.0 || row >= self.n_rows as f64 || col >= self.n_cols as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Row-major linear cell index of `(x, y)`, if inside the grid
    pub fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        self.row_col(x, y).map(|(row, col)| row * self.n_cols + col)
    }
}

/// Overlapping detrending zone used by the glocal residual engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroArea {
    pub name: String,
    /// Indices of member stations in the caller's station array
    pub stations: Vec<usize>,
    /// Row-major DEM cell index -> influence weight in [0, 1]
    pub cell_weights: HashMap<usize, f64>,
}

impl MacroArea {
    pub fn new(name: impl Into<String>, stations: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            stations,
            cell_weights: HashMap::new(),
        }
    }

    pub fn with_cell_weight(mut self, cell: usize, weight: f64) -> Self {
        self.cell_weights.insert(cell, weight);
        self
    }

    /// Influence weight of this area at a DEM cell
    pub fn weight_at(&self, cell: usize) -> Option<f64> {
        self.cell_weights.get(&cell).copied()
    }
}

// =============================================================================
// Climate Parameters
// =============================================================================

/// Monthly lapse rates handed through to the detrending preprocessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateParameters {
    /// Minimum temperature lapse rate per month (°C/m), January first
    pub tmin_lapse_rate: [f64; 12],
    /// Maximum temperature lapse rate per month (°C/m), January first
    pub tmax_lapse_rate: [f64; 12],
}

impl Default for ClimateParameters {
    fn default() -> Self {
        Self {
            tmin_lapse_rate: [crate::constants::DEFAULT_LAPSE_RATE; 12],
            tmax_lapse_rate: [crate::constants::DEFAULT_LAPSE_RATE; 12],
        }
    }
}

impl ClimateParameters {
    /// Climatological lapse rate for a month (1-12), averaged over min and max
    pub fn lapse_rate(&self, month: u32) -> Option<f64> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        let tmin = self.tmin_lapse_rate.get(index)?;
        let tmax = self.tmax_lapse_rate.get(index)?;
        Some((tmin + tmax) / 2.0)
    }
}
