//! Spatial quality control for station networks
//!
//! This module decides, station by station, whether an observation is
//! consistent with what its neighbours say about the same field, and stages
//! the surviving observations for interpolation.
//!
//! # Architecture
//!
//! The module is organized into logical components:
//! - [`staging`] - Build the interpolation point set from accepted stations
//! - [`threshold`] - Variable-family acceptance envelopes
//! - [`residuals`] - Global, local and glocal (macro-area) residual engines
//! - [`detector`] - Two-pass spatial outlier detection
//! - [`cross_validation`] - Mean absolute error from stored residuals
//! - [`gate`] - Per-variable orchestration (assignment, syntactic, spatial)
//! - [`controller`] - `SpatialQualityController` bundling backend and config
//! - [`stats`] - Detector outcomes and QC reports
//!
//! # Processing Pipeline
//!
//! 1. **Assignment**: copy the raw observation (or pre-computed elaboration /
//!    anomaly) into each station's current value
//! 2. **Syntactic QC**: single-station plausibility checks
//! 3. **Detection**: stage, detrend, compute residuals and nominate stations
//!    whose residual exceeds the 2σ-equivalent threshold
//! 4. **Verification**: re-stage without the nominees, re-estimate them and
//!    keep only those still beyond the 3σ-equivalent threshold
//! 5. **Staging**: the accepted set is handed to the interpolation run
//!
//! # Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use spatial_qc::app::services::reference_interpolator::InverseDistanceInterpolator;
//! use spatial_qc::app::services::spatial_control::SpatialQualityController;
//! use spatial_qc::app::services::syntactic_qc::RangeQualityControl;
//! use spatial_qc::config::{InterpolationSettings, QcConfig};
//! use spatial_qc::models::{GeoPoint, MeteoVariable, Station};
//!
//! # fn example() -> spatial_qc::Result<()> {
//! let time = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
//! let mut stations: Vec<Station> = (0..4)
//!     .map(|i| {
//!         let mut station = Station::new(format!("{i}"), "station", GeoPoint::new(i as f64 * 1000.0, 0.0, 100.0));
//!         station.add_observation(MeteoVariable::AirTemperature, time, 20.0 + i as f64 * 0.1);
//!         station
//!     })
//!     .collect();
//!
//! let config = QcConfig::default();
//! let mut controller = SpatialQualityController::new(
//!     InverseDistanceInterpolator::new(),
//!     RangeQualityControl::new(config.syntactic.clone()),
//!     config,
//! );
//!
//! let mut settings = InterpolationSettings::default();
//! let mut points = Vec::new();
//! let report = controller.check_and_pass_data_to_interpolation(
//!     &mut stations,
//!     MeteoVariable::AirTemperature,
//!     time,
//!     &mut settings,
//!     &mut points,
//! )?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod cross_validation;
pub mod detector;
pub mod gate;
pub mod residuals;
pub mod staging;
pub mod stats;
pub mod threshold;

#[cfg(test)]
pub mod tests;

pub use controller::SpatialQualityController;
pub use cross_validation::compute_error_cross_validation;
pub use detector::spatial_quality_control;
pub use gate::{check_and_pass_data_to_interpolation, check_data};
pub use residuals::{
    ResidualFilter, compute_residuals, compute_residuals_glocal,
    compute_residuals_glocal_detrending, compute_residuals_local_detrending,
};
pub use staging::pass_data_to_interpolation;
pub use stats::{QcReport, SpatialQcOutcome};
pub use threshold::find_threshold;
