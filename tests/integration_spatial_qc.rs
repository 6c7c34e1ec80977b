//! Integration tests for the spatial QC workflow
//!
//! These tests load a small station network from CSV files, run the full
//! quality control chain through the public API and check the staged
//! points, the cross-validation error and the Parquet report.

use chrono::{DateTime, TimeZone, Utc};
use polars::prelude::{ParquetReader, SerReader};
use spatial_qc::app::services::reference_interpolator::InverseDistanceInterpolator;
use spatial_qc::app::services::station_io::{load_observations, load_stations, write_qc_report};
use spatial_qc::app::services::syntactic_qc::RangeQualityControl;
use spatial_qc::config::{InterpolationSettings, ResidualStrategy};
use spatial_qc::{MeteoVariable, QcConfig, Quality, SpatialQualityController, Station};
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

const STATIONS_CSV: &str = "\
id,name,utm_x,utm_y,elevation,latitude,longitude,active
S0,Centre,0,0,100,45.00,11.00,true
S1,East,1000,0,100,45.00,11.01,true
S2,West,-1000,0,100,45.00,10.99,true
S3,North,0,1000,100,45.01,11.00,true
S4,South,0,-1000,100,44.99,11.00,true
S5,Remote,50000,50000,100,45.45,11.60,true
S6,Silent,-50000,-50000,100,44.55,10.40,true
";

/// S0 is 10 degrees warmer than its ring, S5 reports an impossible value
/// and S6 has no observation at the checked time
const OBSERVATIONS_CSV: &str = "\
id,variable,time,value
S0,air-temperature,2024-07-01 12:00:00,15
S1,air-temperature,2024-07-01 12:00:00,5
S2,air-temperature,2024-07-01 12:00:00,5
S3,air-temperature,2024-07-01 12:00:00,4
S4,air-temperature,2024-07-01 12:00:00,6
S5,air-temperature,2024-07-01 12:00:00,99
S6,air-temperature,2024-07-01 11:00:00,7
S9,air-temperature,2024-07-01 12:00:00,3
";

fn check_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn load_network() -> Vec<Station> {
    let stations_file = write_csv(STATIONS_CSV);
    let observations_file = write_csv(OBSERVATIONS_CSV);

    let mut stations = load_stations(stations_file.path()).unwrap();
    let attached = load_observations(observations_file.path(), &mut stations).unwrap();
    // S9 is not in the station list
    assert_eq!(attached, 7);
    stations
}

fn controller(config: QcConfig) -> SpatialQualityController<InverseDistanceInterpolator, RangeQualityControl> {
    SpatialQualityController::new(
        InverseDistanceInterpolator::new(),
        RangeQualityControl::new(config.syntactic.clone()),
        config,
    )
}

fn qualities(stations: &[Station]) -> Vec<Quality> {
    stations.iter().map(|station| station.quality).collect()
}

#[test]
fn test_check_and_stage_network() {
    let mut stations = load_network();
    let mut controller = controller(QcConfig::default());
    let mut settings = InterpolationSettings::default();
    let mut points = Vec::new();

    let report = controller
        .check_and_pass_data_to_interpolation(
            &mut stations,
            MeteoVariable::AirTemperature,
            check_time(),
            &mut settings,
            &mut points,
        )
        .unwrap();

    assert_eq!(
        qualities(&stations),
        vec![
            Quality::WrongSpatial,
            Quality::Accepted,
            Quality::Accepted,
            Quality::Accepted,
            Quality::Accepted,
            Quality::WrongSyntactic,
            Quality::MissingData,
        ]
    );

    assert_eq!(report.total_stations, 7);
    assert_eq!(report.accepted, 4);
    assert_eq!(report.wrong_spatial, 1);
    assert_eq!(report.wrong_syntactic, 1);
    assert_eq!(report.missing_data, 1);

    let spatial = report.spatial.as_ref().unwrap();
    assert_eq!(spatial.confirmed, vec![0]);
    assert!(spatial.unverified().is_empty());

    let staged: Vec<usize> = points.iter().map(|point| point.index).collect();
    assert_eq!(staged, vec![1, 2, 3, 4]);
    assert_eq!(report.staged_points, 4);
    assert_eq!(settings.points_range, Some((4.0, 6.0)));
}

#[test]
fn test_cross_validation_strategies() {
    let network = load_network();

    for strategy in [ResidualStrategy::Global, ResidualStrategy::Local] {
        let mut stations = network.clone();
        let mut controller = controller(QcConfig::default().with_residual_strategy(strategy));

        let report = controller
            .cross_validate(&mut stations, MeteoVariable::AirTemperature, check_time(), &[])
            .unwrap();

        // Residuals only on accepted stations
        assert_eq!(stations[0].residual, None);
        assert_eq!(stations[5].residual, None);
        assert_eq!(stations[6].residual, None);
        assert!(stations[1..5].iter().all(|s| s.residual.is_some()));

        let mae = report.cross_validation_mae.unwrap();
        assert!((mae - 0.6).abs() < 1e-9, "{strategy:?}: {mae}");
    }
}

#[test]
fn test_variables_are_independent() {
    let network = load_network();

    // Nothing observed for humidity, so nothing can be staged
    let mut stations = network.clone();
    let mut controller = controller(QcConfig::default());
    let result = controller.check_and_pass_data_to_interpolation(
        &mut stations,
        MeteoVariable::AirRelHumidity,
        check_time(),
        &mut InterpolationSettings::default(),
        &mut Vec::new(),
    );
    assert!(result.unwrap_err().is_input_exhaustion());
    assert!(stations.iter().all(|s| s.quality == Quality::MissingData));

    // Temperature on a fresh copy is unaffected
    let mut stations = network;
    let report = controller
        .check_data(&mut stations, MeteoVariable::AirTemperature, check_time())
        .unwrap();
    assert_eq!(report.wrong_spatial, 1);
}

#[test]
fn test_report_written_to_parquet() {
    let mut stations = load_network();
    let mut controller = controller(QcConfig::default());
    controller
        .check_data(&mut stations, MeteoVariable::AirTemperature, check_time())
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("air-temperature.parquet");
    write_qc_report(&path, &stations, MeteoVariable::AirTemperature).unwrap();

    let df = read_parquet(&path);
    assert_eq!(df.height(), 7);

    let quality = df.column("quality").unwrap().str().unwrap();
    assert_eq!(quality.get(0), Some(Quality::WrongSpatial.as_str()));
    assert_eq!(quality.get(1), Some(Quality::Accepted.as_str()));
    assert_eq!(quality.get(5), Some(Quality::WrongSyntactic.as_str()));
    assert_eq!(quality.get(6), Some(Quality::MissingData.as_str()));

    let values = df.column("value").unwrap().f64().unwrap();
    assert_eq!(values.get(0), Some(15.0));
    assert_eq!(values.get(6), None);
}

#[test]
fn test_config_file_round_trip() {
    let config_file = write_csv(
        "[meteo]\n\
         rainfall_threshold = 0.4\n\
         \n\
         [spatial]\n\
         check_spatial = false\n\
         residual_strategy = \"local\"\n",
    );

    let config = QcConfig::from_toml_file(config_file.path()).unwrap();
    assert_eq!(config.meteo.rainfall_threshold, 0.4);
    assert!(!config.spatial.check_spatial);
    assert_eq!(config.spatial.residual_strategy, ResidualStrategy::Local);
    // Unspecified sections keep their defaults
    assert_eq!(config.spatial.neighbour_count, 10);

    let mut stations = load_network();
    let report = controller(config)
        .check_data(&mut stations, MeteoVariable::AirTemperature, check_time())
        .unwrap();
    assert_eq!(report.wrong_spatial, 0);
    assert!(report.spatial.is_none());
}

fn read_parquet(path: &Path) -> polars::prelude::DataFrame {
    let file = std::fs::File::open(path).unwrap();
    ParquetReader::new(file).finish().unwrap()
}
