//! Statistical helper functions for spatial quality control.

/// Arithmetic mean of a slice. Returns `None` if empty.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (N denominator). Returns `None` if empty.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let mean = mean(data)?;
    let variance = data.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Mean absolute error between paired observed and estimated values.
///
/// Returns `None` if the slices are empty or of different length.
pub fn mean_absolute_error(observed: &[f64], estimated: &[f64]) -> Option<f64> {
    if observed.is_empty() || observed.len() != estimated.len() {
        return None;
    }
    let total: f64 = observed
        .iter()
        .zip(estimated)
        .map(|(obs, est)| (obs - est).abs())
        .sum();
    Some(total / observed.len() as f64)
}

/// Ordinary least squares fit `y = intercept + slope * x`.
///
/// Returns `(intercept, slope)`, or `None` with fewer than two points or
/// when `x` has no spread.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}
