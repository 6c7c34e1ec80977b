//! Tests for the per-family threshold model

use super::assert_close;
use super::super::threshold::find_threshold;
use crate::config::MeteoSettings;
use crate::constants::threshold::DRY_PRECIPITATION_BYPASS;
use crate::models::MeteoVariable;

#[test]
fn test_temperature_threshold() {
    let meteo = MeteoSettings::default();

    // geometry 1 + 1 km/1000 + 200 m/100 = 4, plus 2 * 1.5
    let threshold = find_threshold(
        MeteoVariable::AirTemperature,
        &meteo,
        20.0,
        1.5,
        2.0,
        200.0,
        1000.0,
    );
    assert_close(threshold, 7.0);

    // geometry capped at 12, total capped at 15
    let threshold = find_threshold(
        MeteoVariable::DailyAirTemperatureMax,
        &meteo,
        20.0,
        3.0,
        3.0,
        2000.0,
        50_000.0,
    );
    assert_close(threshold, 15.0);
}

#[test]
fn test_precipitation_threshold() {
    let meteo = MeteoSettings::default();

    // distance weight floored at 1, total floored at 5
    let threshold = find_threshold(
        MeteoVariable::Precipitation,
        &meteo,
        3.0,
        0.5,
        2.0,
        0.0,
        500.0,
    );
    assert_close(threshold, 5.0);

    // 10 km / 2000 = 5, plus 2 * (2 + 1)
    let threshold = find_threshold(
        MeteoVariable::DailyPrecipitation,
        &meteo,
        12.0,
        2.0,
        2.0,
        0.0,
        10_000.0,
    );
    assert_close(threshold, 11.0);
}

#[test]
fn test_dry_precipitation_bypass() {
    let meteo = MeteoSettings::default();

    for value in [0.0, 0.1, meteo.rainfall_threshold] {
        let threshold = find_threshold(
            MeteoVariable::Precipitation,
            &meteo,
            value,
            4.0,
            3.0,
            0.0,
            25_000.0,
        );
        assert_eq!(threshold, DRY_PRECIPITATION_BYPASS);
    }

    let wet = find_threshold(MeteoVariable::Precipitation, &meteo, 0.3, 4.0, 3.0, 0.0, 25_000.0);
    assert!(wet < DRY_PRECIPITATION_BYPASS);
}

#[test]
fn test_other_families() {
    let meteo = MeteoSettings::default();

    // 20 + 50/10 + 2000/1000 + 2 * 4
    let rh = find_threshold(MeteoVariable::AirRelHumidity, &meteo, 60.0, 4.0, 2.0, 50.0, 2000.0);
    assert_close(rh, 35.0);

    // 1 + 100/50 + 4000/2000 + 2 * 1
    let wind = find_threshold(
        MeteoVariable::WindScalarIntensity,
        &meteo,
        3.0,
        1.0,
        2.0,
        100.0,
        4000.0,
    );
    assert_close(wind, 7.0);

    // 500 + 5000/5000 + 10 * 3
    let irradiance = find_threshold(
        MeteoVariable::GlobalIrradiance,
        &meteo,
        700.0,
        10.0,
        2.0,
        0.0,
        5000.0,
    );
    assert_close(irradiance, 531.0);

    // 10 + 0 + 1 * 4
    let radiation = find_threshold(
        MeteoVariable::DailyGlobalRadiation,
        &meteo,
        20.0,
        1.0,
        3.0,
        0.0,
        0.0,
    );
    assert_close(radiation, 14.0);

    let transmissivity = find_threshold(
        MeteoVariable::AtmTransmissivity,
        &meteo,
        0.5,
        0.05,
        2.0,
        0.0,
        0.0,
    );
    assert_close(transmissivity, 0.25);

    let pressure = find_threshold(MeteoVariable::AtmPressure, &meteo, 1013.0, 2.5, 2.0, 0.0, 0.0);
    assert_close(pressure, 5.0);
}

#[test]
fn test_threshold_monotonic_in_multiplier() {
    let meteo = MeteoSettings::default();
    let variables = [
        MeteoVariable::AirTemperature,
        MeteoVariable::Precipitation,
        MeteoVariable::AirRelHumidity,
        MeteoVariable::WindVectorIntensity,
        MeteoVariable::GlobalIrradiance,
        MeteoVariable::DailyGlobalRadiation,
        MeteoVariable::AtmTransmissivity,
        MeteoVariable::LeafWetness,
    ];

    for variable in variables {
        let loose = find_threshold(variable, &meteo, 10.0, 0.8, 2.0, 120.0, 3000.0);
        let strict = find_threshold(variable, &meteo, 10.0, 0.8, 3.0, 120.0, 3000.0);
        assert!(
            strict >= loose,
            "{variable}: threshold with n=3 ({strict}) below n=2 ({loose})"
        );
    }
}
