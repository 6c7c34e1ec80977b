//! Detector outcomes and QC reports
//!
//! This module provides types for tracking what the spatial detector did in
//! one cycle and for summarising the quality state of a station array.

use crate::models::{MeteoVariable, Quality, Station};
use serde::Serialize;

/// What the two-pass spatial detector did in one call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpatialQcOutcome {
    /// Whether the initial staging produced admissible points
    pub staged: bool,
    /// Station indices flagged in the detection pass
    pub nominated: Vec<usize>,
    /// Whether the verification pass ran over the nominees
    pub verification_ran: bool,
    /// Nominees still flagged after verification
    pub confirmed: Vec<usize>,
    /// Nominees returned to `Accepted` after verification
    pub reinstated: Vec<usize>,
}

impl SpatialQcOutcome {
    /// Outcome of a call that could not stage any admissible point
    pub fn not_staged() -> Self {
        Self::default()
    }

    /// Number of stations left flagged by this call
    pub fn flagged_count(&self) -> usize {
        if self.verification_ran {
            self.confirmed.len()
        } else {
            self.nominated.len()
        }
    }

    /// Nominees that stay flagged without having been re-verified
    pub fn unverified(&self) -> &[usize] {
        if self.verification_ran {
            &[]
        } else {
            &self.nominated
        }
    }
}

/// Quality summary of a station array after one QC cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcReport {
    pub variable: MeteoVariable,
    pub total_stations: usize,
    pub active_stations: usize,
    pub not_yet_checked: usize,
    pub accepted: usize,
    pub missing_data: usize,
    pub wrong_syntactic: usize,
    pub wrong_spatial: usize,
    /// Spatial detector outcome, when the detector ran
    pub spatial: Option<SpatialQcOutcome>,
    /// Points staged for the interpolation run
    pub staged_points: usize,
    /// Mean absolute cross-validation error, when residuals are available
    pub cross_validation_mae: Option<f64>,
}

impl QcReport {
    /// Count quality states over a station array
    pub fn from_stations(
        variable: MeteoVariable,
        stations: &[Station],
        spatial: Option<SpatialQcOutcome>,
    ) -> Self {
        let mut report = Self {
            variable,
            total_stations: stations.len(),
            active_stations: 0,
            not_yet_checked: 0,
            accepted: 0,
            missing_data: 0,
            wrong_syntactic: 0,
            wrong_spatial: 0,
            spatial,
            staged_points: 0,
            cross_validation_mae: None,
        };

        for station in stations {
            if station.active {
                report.active_stations += 1;
            }
            match station.quality {
                Quality::NotYetChecked => report.not_yet_checked += 1,
                Quality::Accepted => report.accepted += 1,
                Quality::MissingData => report.missing_data += 1,
                Quality::WrongSyntactic => report.wrong_syntactic += 1,
                Quality::WrongSpatial => report.wrong_spatial += 1,
            }
        }

        report
    }

    pub fn with_staged_points(mut self, staged_points: usize) -> Self {
        self.staged_points = staged_points;
        self
    }

    pub fn with_cross_validation(mut self, mae: Option<f64>) -> Self {
        self.cross_validation_mae = mae;
        self
    }

    /// Calculate acceptance rate as a percentage of stations with a value
    pub fn acceptance_rate(&self) -> f64 {
        let checked = self.accepted + self.wrong_syntactic + self.wrong_spatial;
        if checked == 0 {
            0.0
        } else {
            (self.accepted as f64 / checked as f64) * 100.0
        }
    }

    /// Get summary string for logging
    pub fn summary(&self) -> String {
        let mae = self
            .cross_validation_mae
            .map_or_else(|| "n/a".to_string(), |mae| format!("{mae:.3}"));
        format!(
            "QC Summary [{}]: {} stations ({} active) | \
             Accepted: {} ({:.1}%) | Missing: {} | Syntactic: {} | Spatial: {} | \
             Staged: {} | CV MAE: {}",
            self.variable,
            self.total_stations,
            self.active_stations,
            self.accepted,
            self.acceptance_rate(),
            self.missing_data,
            self.wrong_syntactic,
            self.wrong_spatial,
            self.staged_points,
            mae
        )
    }
}
