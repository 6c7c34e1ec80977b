//! Station network input and QC report output
//!
//! Stations are read from a metadata CSV (one row per station) and an
//! observations CSV in long format (`id, variable, time, value`). QC
//! results are written back as a flat Parquet table, one row per station.

use crate::constants::station_columns as cols;
use crate::models::{GeoPoint, LapseRateCode, MeteoVariable, Station};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(Error::io(
            format!("Input file not found: {}", path.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!("Read {} rows from {}", df.height(), path.display());
    Ok(df)
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Optional column: absent columns read as all-null
fn optional_f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        f64_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

fn optional_string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        string_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

fn parse_active(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) => !matches!(v.as_str(), "false" | "0" | "no" | "n"),
        None => true,
    }
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::data_validation(format!("Invalid timestamp '{}'", value)))
}

/// Load station metadata
///
/// Required columns: `id`, `utm_x`, `utm_y`, `elevation`. Optional:
/// `name`, `latitude`, `longitude`, `active`, `lapse_rate_code`.
/// The elevation becomes proxy 0.
pub fn load_stations(path: &Path) -> Result<Vec<Station>> {
    let df = read_csv(path)?;

    let ids = string_column(&df, cols::ID)?;
    let utm_x = f64_column(&df, cols::UTM_X)?;
    let utm_y = f64_column(&df, cols::UTM_Y)?;
    let elevation = f64_column(&df, cols::ELEVATION)?;
    let names = optional_string_column(&df, cols::NAME)?;
    let latitude = optional_f64_column(&df, cols::LATITUDE)?;
    let longitude = optional_f64_column(&df, cols::LONGITUDE)?;
    let active = optional_string_column(&df, cols::ACTIVE)?;
    let codes = optional_string_column(&df, cols::LAPSE_RATE_CODE)?;

    let mut stations = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let (Some(id), Some(x), Some(y), Some(z)) =
            (ids[row].clone(), utm_x[row], utm_y[row], elevation[row])
        else {
            return Err(Error::data_validation(format!(
                "Station row {} in {} is missing id, coordinates or elevation",
                row + 1,
                path.display()
            )));
        };

        let mut point = GeoPoint::new(x, y, z);
        point.latitude = latitude[row].unwrap_or_default();
        point.longitude = longitude[row].unwrap_or_default();

        let name = names[row].clone().unwrap_or_else(|| id.clone());
        let mut station = Station::new(id, name, point);
        station.active = parse_active(active[row].as_deref());
        station.proxy_values = vec![Some(z)];

        if let Some(code) = codes[row].as_deref() {
            station.lapse_rate_code = code.parse::<LapseRateCode>()?;
        }

        stations.push(station);
    }

    info!("Loaded {} stations from {}", stations.len(), path.display());
    Ok(stations)
}

/// Attach observations from a long-format CSV to already loaded stations
///
/// Rows for unknown stations are skipped with a warning. Rows with an
/// empty value are kept out of the series, so the station reads as
/// missing at that time.
///
/// # Returns
///
/// Number of observations attached
pub fn load_observations(path: &Path, stations: &mut [Station]) -> Result<usize> {
    let df = read_csv(path)?;

    let ids = string_column(&df, cols::ID)?;
    let variables = string_column(&df, cols::VARIABLE)?;
    let times = string_column(&df, cols::TIME)?;
    let values = f64_column(&df, cols::VALUE)?;

    let index: HashMap<String, usize> = stations
        .iter()
        .enumerate()
        .map(|(i, station)| (station.id.clone(), i))
        .collect();

    let mut attached = 0;
    let mut unknown = 0;

    for row in 0..df.height() {
        let (Some(id), Some(variable), Some(time)) =
            (ids[row].as_deref(), variables[row].as_deref(), times[row].as_deref())
        else {
            return Err(Error::data_validation(format!(
                "Observation row {} in {} is missing id, variable or time",
                row + 1,
                path.display()
            )));
        };

        let Some(&station_index) = index.get(id) else {
            unknown += 1;
            continue;
        };
        let Some(value) = values[row] else {
            continue;
        };

        let variable: MeteoVariable = variable.parse()?;
        let time = parse_time(time)?;
        stations[station_index].add_observation(variable, time, value);
        attached += 1;
    }

    if unknown > 0 {
        warn!(
            "Skipped {} observations for stations not in the station list",
            unknown
        );
    }

    info!("Attached {} observations from {}", attached, path.display());
    Ok(attached)
}

/// Build the per-station QC result table
pub fn qc_report_frame(stations: &[Station], variable: MeteoVariable) -> Result<DataFrame> {
    let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
    let names: Vec<&str> = stations.iter().map(|s| s.name.as_str()).collect();
    let utm_x: Vec<f64> = stations.iter().map(|s| s.point.utm_x).collect();
    let utm_y: Vec<f64> = stations.iter().map(|s| s.point.utm_y).collect();
    let elevation: Vec<f64> = stations.iter().map(|s| s.point.z).collect();
    let active: Vec<bool> = stations.iter().map(|s| s.active).collect();
    let variables: Vec<&str> = vec![variable.name(); stations.len()];
    let values: Vec<Option<f64>> = stations.iter().map(|s| s.current_value).collect();
    let quality: Vec<&str> = stations.iter().map(|s| s.quality.as_str()).collect();
    let residuals: Vec<Option<f64>> = stations.iter().map(|s| s.residual).collect();

    let df = df!(
        cols::ID => ids,
        cols::NAME => names,
        cols::UTM_X => utm_x,
        cols::UTM_Y => utm_y,
        cols::ELEVATION => elevation,
        cols::ACTIVE => active,
        cols::VARIABLE => variables,
        cols::VALUE => values,
        "quality" => quality,
        "residual" => residuals,
    )?;

    Ok(df)
}

/// Write per-station QC results to a Snappy-compressed Parquet file
pub fn write_qc_report(path: &Path, stations: &[Station], variable: MeteoVariable) -> Result<()> {
    let mut df = qc_report_frame(stations, variable)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io("Failed to create output directory", e))?;
    }

    let file = std::fs::File::create(path)
        .map_err(|e| Error::io(format!("Failed to create {}", path.display()), e))?;

    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)?;

    info!(
        "Wrote QC report for {} ({} stations) to {}",
        variable,
        stations.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quality;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_time("2024-07-01T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_time("2024-07-01 12:00:00").unwrap(), expected);
        assert_eq!(parse_time("2024-07-01 12:00").unwrap(), expected);
        assert!(parse_time("01/07/2024").is_err());
    }

    #[test]
    fn test_load_stations_and_observations() {
        let stations_file = write_file(
            "id,name,utm_x,utm_y,elevation,active,lapse_rate_code\n\
             A,Alpha,0,0,100,true,0\n\
             B,Beta,1000,0,250,false,supplemental\n",
        );
        let observations_file = write_file(
            "id,variable,time,value\n\
             A,air-temperature,2024-07-01 12:00:00,21.5\n\
             B,air_temperature,2024-07-01 12:00:00,\n\
             Z,air-temperature,2024-07-01 12:00:00,18.0\n",
        );

        let mut stations = load_stations(stations_file.path()).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Alpha");
        assert!(stations[0].active);
        assert!(!stations[1].active);
        assert_eq!(stations[1].lapse_rate_code, LapseRateCode::Supplemental);
        assert_eq!(stations[1].proxy_values, vec![Some(250.0)]);

        let attached = load_observations(observations_file.path(), &mut stations).unwrap();
        assert_eq!(attached, 1);

        let time = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(
            stations[0].value_at(time, MeteoVariable::AirTemperature),
            Some(21.5)
        );
        assert_eq!(stations[1].value_at(time, MeteoVariable::AirTemperature), None);
    }

    #[test]
    fn test_missing_input_file() {
        let result = load_stations(Path::new("/nonexistent/stations.csv"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_write_qc_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("report.parquet");

        let mut station = Station::new("A", "Alpha", GeoPoint::new(0.0, 0.0, 10.0));
        station.current_value = Some(20.0);
        station.quality = Quality::WrongSpatial;
        station.residual = Some(4.5);
        let stations = vec![station, Station::new("B", "Beta", GeoPoint::default())];

        let frame = qc_report_frame(&stations, MeteoVariable::AirTemperature).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 10);

        write_qc_report(&path, &stations, MeteoVariable::AirTemperature).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
