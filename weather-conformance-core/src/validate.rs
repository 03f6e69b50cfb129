//! Contract checks for a decoded `/weather` body.
//!
//! Every check runs; violations accumulate so one report lists all of them.

use std::fmt;

use thiserror::Error;

use crate::model::{CityRecord, WeatherResponse};
use crate::units::{Bounds, UnitSystem};

/// Absolute tolerance for coordinate comparison against the catalog.
pub const COORDINATE_TOLERANCE: f64 = 0.01;

/// Humidity is a percentage.
pub const HUMIDITY_RANGE: Bounds = Bounds {
    min: 0.0,
    max: 100.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::Latitude => "Latitude",
            Axis::Longitude => "Longitude",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("{field} {value} is outside valid {unit} range {range}")]
    TemperatureOutOfRange {
        field: &'static str,
        value: f64,
        unit: UnitSystem,
        range: Bounds,
    },

    #[error("Humidity {0} is outside valid range [0, 100]")]
    HumidityOutOfRange(f64),

    #[error("Weather conditions list is empty")]
    MissingWeatherConditions,

    #[error("Weather description should not be empty")]
    EmptyDescription,

    #[error("{0} should not be zero")]
    ZeroCoordinate(Axis),

    #[error("Country mismatch: expected '{expected}', got '{actual}'")]
    CountryMismatch { expected: String, actual: String },

    #[error("City id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: u64, actual: u64 },

    #[error("{axis} mismatch: expected {expected} +/- 0.01, got {actual}")]
    CoordinateMismatch {
        axis: Axis,
        expected: f64,
        actual: f64,
    },

    #[error("Embedded status code: expected 200, got {0}")]
    StatusCode(i64),
}

/// One or more violated checks.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} check(s) failed: {}", .violations.len(), join(.violations))]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks `response` against the contract for `unit` and the expected `subject`.
pub fn validate(
    response: &WeatherResponse,
    unit: UnitSystem,
    subject: &CityRecord,
) -> Result<(), ValidationFailure> {
    let mut violations = Vec::new();

    let range = unit.temperature_range();
    let main = &response.main;
    for (field, value) in [
        ("Temperature", main.temp),
        ("Feels-like temperature", main.feels_like),
        ("Minimum temperature", main.temp_min),
        ("Maximum temperature", main.temp_max),
    ] {
        if !range.contains(value) {
            violations.push(Violation::TemperatureOutOfRange {
                field,
                value,
                unit,
                range,
            });
        }
    }

    if !HUMIDITY_RANGE.contains(main.humidity) {
        violations.push(Violation::HumidityOutOfRange(main.humidity));
    }

    match response.first_description() {
        None => violations.push(Violation::MissingWeatherConditions),
        Some(d) if d.is_empty() => violations.push(Violation::EmptyDescription),
        Some(_) => {}
    }

    let coord = response.coord;
    if coord.lat == 0.0 {
        violations.push(Violation::ZeroCoordinate(Axis::Latitude));
    }
    if coord.lon == 0.0 {
        violations.push(Violation::ZeroCoordinate(Axis::Longitude));
    }

    if response.sys.country != subject.country {
        violations.push(Violation::CountryMismatch {
            expected: subject.country.clone(),
            actual: response.sys.country.clone(),
        });
    }

    if response.id != subject.id {
        violations.push(Violation::IdMismatch {
            expected: subject.id,
            actual: response.id,
        });
    }

    for (axis, expected, actual) in [
        (Axis::Latitude, subject.coord.lat, coord.lat),
        (Axis::Longitude, subject.coord.lon, coord.lon),
    ] {
        if !within_tolerance(expected, actual) {
            violations.push(Violation::CoordinateMismatch {
                axis,
                expected,
                actual,
            });
        }
    }

    if response.cod != 200 {
        violations.push(Violation::StatusCode(response.cod));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { violations })
    }
}

fn within_tolerance(expected: f64, actual: f64) -> bool {
    // small epsilon so a difference of exactly 0.01 is not lost to float error
    (expected - actual).abs() <= COORDINATE_TOLERANCE + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, MainMetrics, SystemInfo, WeatherCondition};

    fn london() -> CityRecord {
        CityRecord {
            id: 2643743,
            name: "London".into(),
            state: None,
            country: "GB".into(),
            coord: Coordinates {
                lat: 51.5085,
                lon: -0.1257,
            },
        }
    }

    fn response(temp: f64) -> WeatherResponse {
        WeatherResponse {
            id: 2643743,
            name: "London".into(),
            coord: Coordinates {
                lat: 51.51,
                lon: -0.13,
            },
            main: MainMetrics {
                temp,
                feels_like: temp,
                temp_min: temp,
                temp_max: temp,
                humidity: 81.0,
            },
            weather: vec![WeatherCondition {
                id: Some(800),
                main: Some("Clear".into()),
                description: "clear sky".into(),
            }],
            sys: SystemInfo { country: "GB".into() },
            cod: 200,
        }
    }

    fn passes(temp: f64, unit: UnitSystem) -> bool {
        validate(&response(temp), unit, &london()).is_ok()
    }

    #[test]
    fn valid_response_passes_for_each_unit_system() {
        assert!(passes(12.0, UnitSystem::Metric));
        assert!(passes(54.0, UnitSystem::Imperial));
        assert!(passes(285.0, UnitSystem::Standard));
    }

    #[test]
    fn kelvin_value_fails_metric_range_for_all_four_fields() {
        let err = validate(&response(285.0), UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations.len(), 4);
        assert!(
            err.violations
                .iter()
                .all(|v| matches!(v, Violation::TemperatureOutOfRange { .. }))
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(passes(-50.0, UnitSystem::Metric));
        assert!(passes(323.0, UnitSystem::Standard));
        assert!(passes(130.0, UnitSystem::Imperial));
    }

    #[test]
    fn humidity_out_of_range() {
        let mut resp = response(10.0);
        resp.main.humidity = 101.0;
        let err = validate(&resp, UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations, vec![Violation::HumidityOutOfRange(101.0)]);

        resp.main.humidity = 0.0;
        assert!(validate(&resp, UnitSystem::Metric, &london()).is_ok());
    }

    #[test]
    fn empty_and_missing_descriptions_are_distinct() {
        let mut resp = response(10.0);
        resp.weather[0].description.clear();
        let err = validate(&resp, UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations, vec![Violation::EmptyDescription]);

        resp.weather.clear();
        let err = validate(&resp, UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations, vec![Violation::MissingWeatherConditions]);
    }

    #[test]
    fn coordinates_within_tolerance_pass() {
        let mut resp = response(10.0);
        resp.coord = Coordinates {
            lat: 51.5085 + 0.01,
            lon: -0.1257 - 0.01,
        };
        assert!(validate(&resp, UnitSystem::Metric, &london()).is_ok());
    }

    #[test]
    fn coordinates_outside_tolerance_fail() {
        let mut resp = response(10.0);
        resp.coord = Coordinates {
            lat: 51.53,
            lon: -0.1257,
        };
        let err = validate(&resp, UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(matches!(
            err.violations[0],
            Violation::CoordinateMismatch {
                axis: Axis::Latitude,
                ..
            }
        ));
    }

    #[test]
    fn zero_coordinates_are_reported() {
        let mut subject = london();
        subject.coord = Coordinates { lat: 0.0, lon: 0.0 };
        let mut resp = response(10.0);
        resp.coord = Coordinates { lat: 0.0, lon: 0.0 };
        let err = validate(&resp, UnitSystem::Metric, &subject).unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::ZeroCoordinate(Axis::Latitude),
                Violation::ZeroCoordinate(Axis::Longitude),
            ]
        );
    }

    #[test]
    fn identity_mismatches_accumulate() {
        let mut resp = response(10.0);
        resp.id = 1;
        resp.sys.country = "US".into();
        resp.cod = 404;
        let err = validate(&resp, UnitSystem::Metric, &london()).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        let msg = err.to_string();
        assert!(msg.starts_with("3 check(s) failed"));
        assert!(msg.contains("Country mismatch"));
        assert!(msg.contains("City id mismatch"));
        assert!(msg.contains("expected 200, got 404"));
    }
}
