//! Spatial QC Library
//!
//! Spatial quality control and residual analysis for meteorological station
//! networks, run ahead of a spatial interpolation engine.
//!
//! This library provides tools for:
//! - Syntactic (single-station) plausibility checks per variable family
//! - Two-pass spatial outlier detection against neighbour-based estimates
//! - Staging accepted observations as interpolation points
//! - Cross-validation residuals with global, local and glocal detrending
//! - Loading station networks from CSV and writing Parquet QC reports
//!
//! The interpolation engine itself is abstracted behind the
//! [`Interpolator`](app::interpolation::Interpolator) trait; an
//! inverse-distance reference backend is included.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod statistics;

// Core application modules
pub mod app {
    pub mod interpolation;
    pub mod services {
        pub mod reference_interpolator;
        pub mod spatial_control;
        pub mod station_io;
        pub mod syntactic_qc;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::interpolation::{Interpolator, QcContext};
pub use app::services::spatial_control::{QcReport, SpatialQcOutcome, SpatialQualityController};
pub use config::QcConfig;
pub use error::{Error, Result};
pub use models::{MeteoVariable, Quality, Station};
