//! Tests for cross-validation error

use super::super::cross_validation::compute_error_cross_validation;
use super::{assert_close, create_test_station};
use crate::models::Station;

fn with_residual(id: &str, value: f64, residual: Option<f64>) -> Station {
    let mut station = create_test_station(id, 0.0, 0.0, 0.0, value);
    station.residual = residual;
    station
}

#[test]
fn test_mean_absolute_error_from_residuals() {
    let stations = vec![
        with_residual("A", 10.0, Some(1.0)),
        with_residual("B", 12.0, Some(-1.0)),
        with_residual("C", 8.0, Some(2.0)),
    ];

    assert_close(compute_error_cross_validation(&stations).unwrap(), 4.0 / 3.0);
}

#[test]
fn test_incomplete_stations_skipped() {
    let mut inactive = with_residual("D", 100.0, Some(50.0));
    inactive.active = false;
    let mut no_value = with_residual("E", 0.0, Some(7.0));
    no_value.current_value = None;

    let stations = vec![
        with_residual("A", 10.0, Some(1.0)),
        with_residual("B", 12.0, None),
        inactive,
        no_value,
    ];

    assert_close(compute_error_cross_validation(&stations).unwrap(), 1.0);
}

#[test]
fn test_no_pairs() {
    assert_eq!(compute_error_cross_validation(&[]), None);

    let stations = vec![with_residual("A", 10.0, None)];
    assert_eq!(compute_error_cross_validation(&stations), None);
}
