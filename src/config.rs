//! Configuration management and validation.
//!
//! Provides the settings bundles consumed by the QC pipeline (meteorological
//! settings, interpolation settings, spatial QC policy, syntactic ranges)
//! and the top-level `QcConfig`, which can be loaded from a TOML file.

use crate::constants::{
    self, DEFAULT_LOCAL_RADIUS, DEFAULT_MIN_REGRESSION_POINTS, DEFAULT_NEIGHBOUR_COUNT,
    DEFAULT_RAINFALL_THRESHOLD, DETECTION_NR_STD_DEV, VERIFICATION_NR_STD_DEV,
};
use crate::models::{ClimateParameters, DemHeader, VariableFamily};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Variable-independent meteorological settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteoSettings {
    /// Precipitation (mm) at or below which a report counts as dry
    pub rainfall_threshold: f64,
}

impl Default for MeteoSettings {
    fn default() -> Self {
        Self {
            rainfall_threshold: DEFAULT_RAINFALL_THRESHOLD,
        }
    }
}

/// Settings shared with the interpolation backend
///
/// The point stager writes `points_bounding_box_area` and `points_range`
/// as a side effect of every successful staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationSettings {
    /// Honour station lapse-rate codes when selecting points
    pub use_lapse_rate_code: bool,

    /// Admit supplemental stations into elevation detrending
    pub use_supplemental: bool,

    /// Search radius (m) for local detrending subsets
    pub local_radius: f64,

    /// Secondary (wider) search radius (m) for local detrending subsets
    pub secondary_local_radius: f64,

    /// Minimum admissible points for an elevation regression
    pub min_regression_points: usize,

    /// Position of the elevation proxy in station proxy arrays
    pub elevation_proxy_index: usize,

    /// Header of the active DEM, required by glocal detrending
    pub dem_header: Option<DemHeader>,

    /// Bounding-box area of the last staged point set
    #[serde(skip)]
    pub points_bounding_box_area: Option<f64>,

    /// Value range (min, max) of the last staged point set
    #[serde(skip)]
    pub points_range: Option<(f64, f64)>,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            use_lapse_rate_code: false,
            use_supplemental: false,
            local_radius: DEFAULT_LOCAL_RADIUS,
            secondary_local_radius: DEFAULT_LOCAL_RADIUS * 2.0,
            min_regression_points: DEFAULT_MIN_REGRESSION_POINTS,
            elevation_proxy_index: 0,
            dem_header: None,
            points_bounding_box_area: None,
            points_range: None,
        }
    }
}

impl InterpolationSettings {
    /// Record the bounding-box area of the staged points
    pub fn set_points_bounding_box_area(&mut self, area: f64) {
        self.points_bounding_box_area = Some(area);
    }

    /// Record the value range of the staged points
    pub fn set_points_range(&mut self, min: f64, max: f64) {
        self.points_range = Some((min, max));
    }
}

/// Residual strategy used for cross-validation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidualStrategy {
    /// One detrend over the whole staged point set
    #[default]
    Global,
    /// Detrend a local subset around every station
    Local,
    /// Detrend per macro area and blend by cell weights
    Glocal,
}

/// Policy of the two-pass spatial outlier detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialQcConfig {
    /// Run the spatial detector after syntactic QC
    pub check_spatial: bool,

    /// Neighbours used for neighbourhood variability statistics
    pub neighbour_count: usize,

    /// Standard deviation multiplier used to nominate outliers
    pub detection_nr_std_dev: f64,

    /// Standard deviation multiplier used to confirm outliers
    pub verification_nr_std_dev: f64,

    /// Residual strategy for cross-validation
    pub residual_strategy: ResidualStrategy,
}

impl Default for SpatialQcConfig {
    fn default() -> Self {
        Self {
            check_spatial: true,
            neighbour_count: DEFAULT_NEIGHBOUR_COUNT,
            detection_nr_std_dev: DETECTION_NR_STD_DEV,
            verification_nr_std_dev: VERIFICATION_NR_STD_DEV,
            residual_strategy: ResidualStrategy::Global,
        }
    }
}

/// Physical plausibility range for one variable family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<(f64, f64)> for ValueRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}

/// Ranges used by the reference syntactic QC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntacticRanges {
    pub temperature: ValueRange,
    pub precipitation: ValueRange,
    pub relative_humidity: ValueRange,
    pub wind_intensity: ValueRange,
    pub wind_direction: ValueRange,
    pub irradiance: ValueRange,
    pub daily_radiation: ValueRange,
    pub transmissivity: ValueRange,
}

impl Default for SyntacticRanges {
    fn default() -> Self {
        use constants::physical_ranges as ranges;
        Self {
            temperature: ranges::TEMPERATURE.into(),
            precipitation: ranges::PRECIPITATION.into(),
            relative_humidity: ranges::REL_HUMIDITY.into(),
            wind_intensity: ranges::WIND_INTENSITY.into(),
            wind_direction: ranges::WIND_DIRECTION.into(),
            irradiance: ranges::IRRADIANCE.into(),
            daily_radiation: ranges::DAILY_RADIATION.into(),
            transmissivity: ranges::TRANSMISSIVITY.into(),
        }
    }
}

impl SyntacticRanges {
    /// Range for a variable family; `None` means no range check applies
    pub fn for_family(&self, family: VariableFamily) -> Option<ValueRange> {
        match family {
            VariableFamily::Temperature => Some(self.temperature),
            VariableFamily::Precipitation => Some(self.precipitation),
            VariableFamily::RelativeHumidity => Some(self.relative_humidity),
            VariableFamily::WindIntensity => Some(self.wind_intensity),
            VariableFamily::WindDirection => Some(self.wind_direction),
            VariableFamily::Irradiance => Some(self.irradiance),
            VariableFamily::DailyRadiation => Some(self.daily_radiation),
            VariableFamily::Transmissivity => Some(self.transmissivity),
            VariableFamily::Derived | VariableFamily::Other => None,
        }
    }
}

/// Global configuration for spatial quality control
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    pub meteo: MeteoSettings,

    /// Settings for the spatial QC interpolation runs
    pub interpolation: InterpolationSettings,

    pub spatial: SpatialQcConfig,

    pub syntactic: SyntacticRanges,

    pub climate: ClimateParameters,
}

impl QcConfig {
    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        let config: QcConfig = toml::from_str(&content)
            .map_err(|e| Error::configuration_file(path, e.to_string()))?;
        config.validate()?;
        debug!("Loaded QC configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.meteo.rainfall_threshold < 0.0 {
            return Err(Error::configuration(format!(
                "Rainfall threshold {} cannot be negative",
                self.meteo.rainfall_threshold
            )));
        }

        if self.spatial.neighbour_count < 2 {
            return Err(Error::configuration(format!(
                "Neighbour count {} must be at least 2",
                self.spatial.neighbour_count
            )));
        }

        if self.spatial.detection_nr_std_dev <= 0.0 || self.spatial.verification_nr_std_dev <= 0.0
        {
            return Err(Error::configuration(
                "Standard deviation multipliers must be positive",
            ));
        }

        if self.interpolation.local_radius <= 0.0 {
            return Err(Error::configuration(format!(
                "Local radius {} must be positive",
                self.interpolation.local_radius
            )));
        }

        if self.spatial.residual_strategy == ResidualStrategy::Glocal
            && self.interpolation.dem_header.is_none()
        {
            return Err(Error::configuration(
                "Glocal residual strategy requires a DEM header",
            ));
        }

        Ok(())
    }

    /// Enable or disable the spatial detector
    pub fn with_check_spatial(mut self, check_spatial: bool) -> Self {
        self.spatial.check_spatial = check_spatial;
        self
    }

    /// Set the rainfall threshold
    pub fn with_rainfall_threshold(mut self, threshold: f64) -> Self {
        self.meteo.rainfall_threshold = threshold;
        self
    }

    /// Honour station lapse-rate codes
    pub fn with_lapse_rate_code(mut self, use_lapse_rate_code: bool) -> Self {
        self.interpolation.use_lapse_rate_code = use_lapse_rate_code;
        self
    }

    /// Set the residual strategy used for cross-validation
    pub fn with_residual_strategy(mut self, strategy: ResidualStrategy) -> Self {
        self.spatial.residual_strategy = strategy;
        self
    }

    /// Set the DEM header used by glocal detrending
    pub fn with_dem_header(mut self, header: DemHeader) -> Self {
        self.interpolation.dem_header = Some(header);
        self
    }
}
