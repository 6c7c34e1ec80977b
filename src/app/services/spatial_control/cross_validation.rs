//! Cross-validation error from stored residuals

use crate::models::Station;
use crate::statistics;

/// Mean absolute error between observed and estimated values
///
/// The estimate at each active station is rebuilt as `observed - residual`.
/// Stations missing either the value or the residual are skipped.
///
/// # Returns
///
/// `None` when no station contributes a pair
pub fn compute_error_cross_validation(stations: &[Station]) -> Option<f64> {
    let (observed, estimated): (Vec<f64>, Vec<f64>) = stations
        .iter()
        .filter(|station| station.active)
        .filter_map(|station| {
            let value = station.current_value?;
            let residual = station.residual?;
            Some((value, value - residual))
        })
        .unzip();

    statistics::mean_absolute_error(&observed, &estimated)
}
