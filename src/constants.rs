//! Application constants for spatial quality control
//!
//! This module contains the numeric policy constants, default values
//! and physical ranges used throughout the spatial QC pipeline.

// =============================================================================
// Spatial Quality Control
// =============================================================================

/// Number of neighbours used for neighbourhood variability statistics
pub const DEFAULT_NEIGHBOUR_COUNT: usize = 10;

/// Standard deviation multiplier used to nominate outliers (first pass)
pub const DETECTION_NR_STD_DEV: f64 = 2.0;

/// Standard deviation multiplier used to confirm outliers (second pass)
pub const VERIFICATION_NR_STD_DEV: f64 = 3.0;

/// Divisor applied to the observed value to floor the neighbourhood stddev
pub const STD_DEV_VALUE_FLOOR_DIVISOR: f64 = 100.0;

// =============================================================================
// Threshold Model
// =============================================================================

/// Threshold policy constants per variable family
pub mod threshold {
    /// Threshold returned for dry precipitation reports (never flagged)
    pub const DRY_PRECIPITATION_BYPASS: f64 = 900.0;

    pub const PRECIPITATION_MIN_THRESHOLD: f64 = 5.0;
    pub const PRECIPITATION_MIN_DISTANCE_WEIGHT: f64 = 1.0;
    pub const PRECIPITATION_DISTANCE_DIVISOR: f64 = 2000.0;

    pub const TEMPERATURE_BASE: f64 = 1.0;
    pub const TEMPERATURE_ELEVATION_DIVISOR: f64 = 100.0;
    pub const TEMPERATURE_DISTANCE_DIVISOR: f64 = 1000.0;
    pub const TEMPERATURE_GEOMETRY_CAP: f64 = 12.0;
    pub const TEMPERATURE_CAP: f64 = 15.0;

    pub const REL_HUMIDITY_BASE: f64 = 20.0;
    pub const REL_HUMIDITY_ELEVATION_DIVISOR: f64 = 10.0;
    pub const REL_HUMIDITY_DISTANCE_DIVISOR: f64 = 1000.0;

    pub const WIND_BASE: f64 = 1.0;
    pub const WIND_ELEVATION_DIVISOR: f64 = 50.0;
    pub const WIND_DISTANCE_DIVISOR: f64 = 2000.0;

    pub const IRRADIANCE_BASE: f64 = 500.0;
    pub const DAILY_RADIATION_BASE: f64 = 10.0;
    pub const RADIATION_DISTANCE_DIVISOR: f64 = 5000.0;

    pub const TRANSMISSIVITY_MIN_THRESHOLD: f64 = 0.25;
}

// =============================================================================
// Meteorological Settings Defaults
// =============================================================================

/// Default rainfall threshold (mm) below which a report counts as dry
pub const DEFAULT_RAINFALL_THRESHOLD: f64 = 0.2;

/// Default radius (m) for local detrending subsets
pub const DEFAULT_LOCAL_RADIUS: f64 = 15_000.0;

/// Minimum admissible points for an elevation regression
pub const DEFAULT_MIN_REGRESSION_POINTS: usize = 5;

/// Minimum elevation spread (m) for an elevation regression to be meaningful
pub const MIN_ELEVATION_SPREAD: f64 = 50.0;

/// Distance (m) under which a point is treated as coincident with the target
pub const COINCIDENT_DISTANCE: f64 = 1.0;

/// Default temperature lapse rate (°C/m)
pub const DEFAULT_LAPSE_RATE: f64 = -0.0065;

// =============================================================================
// Syntactic Ranges
// =============================================================================

/// Physical plausibility ranges used by the reference syntactic QC
pub mod physical_ranges {
    pub const TEMPERATURE: (f64, f64) = (-60.0, 60.0);
    pub const PRECIPITATION: (f64, f64) = (0.0, 500.0);
    pub const REL_HUMIDITY: (f64, f64) = (1.0, 102.0);
    pub const WIND_INTENSITY: (f64, f64) = (0.0, 150.0);
    pub const WIND_DIRECTION: (f64, f64) = (0.0, 360.0);
    pub const IRRADIANCE: (f64, f64) = (0.0, 1500.0);
    pub const DAILY_RADIATION: (f64, f64) = (0.0, 60.0);
    pub const TRANSMISSIVITY: (f64, f64) = (0.0, 1.0);
}

// =============================================================================
// Report Output
// =============================================================================

/// Default file name for the Parquet QC report
pub const DEFAULT_REPORT_FILE: &str = "spatial_qc_report.parquet";

/// Column names expected in the station input CSV
pub mod station_columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const UTM_X: &str = "utm_x";
    pub const UTM_Y: &str = "utm_y";
    pub const ELEVATION: &str = "elevation";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ACTIVE: &str = "active";
    pub const LAPSE_RATE_CODE: &str = "lapse_rate_code";
    pub const VARIABLE: &str = "variable";
    pub const TIME: &str = "time";
    pub const VALUE: &str = "value";
}

/// Upper bound on the number of variables checked concurrently by the CLI
pub const DEFAULT_PARALLEL_WORKERS: usize = 4;
