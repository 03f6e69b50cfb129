//! The conformance scenarios exercised against the API.

use std::fmt;

use reqwest::StatusCode;

use crate::error::{HarnessError, Result};
use crate::fixture::RunContext;
use crate::model::{ErrorResponse, WeatherResponse, from_json_case_insensitive};
use crate::units::{ResponseMode, UnitSystem};
use crate::validate::validate;

pub mod expect;

pub const JSON: &str = "application/json";
pub const JSONP: &str = "text/plain";

/// Key the API must reject.
pub const INVALID_API_KEY: &str = "someValue";
/// City id assumed never to exist.
pub const UNKNOWN_CITY_ID: u64 = 1;
pub const UNKNOWN_PATH: &str = "weather123?";
pub const CALLBACK: &str = "someTestFunction";
/// Language pair whose descriptions must differ.
pub const LANGUAGES: (&str, &str) = ("en", "lt");

pub fn nothing_to_geocode() -> ErrorResponse {
    ErrorResponse::new("400", "Nothing to geocode")
}

pub fn city_not_found() -> ErrorResponse {
    ErrorResponse::new("404", "city not found")
}

pub fn internal_error() -> ErrorResponse {
    ErrorResponse::new("404", "Internal error")
}

pub fn invalid_api_key() -> ErrorResponse {
    ErrorResponse::new(
        "401",
        "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info.",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    WeatherByCityId(UnitSystem),
    WeatherByLatLon,
    WeatherByMode(ResponseMode),
    TranslatedDescription,
    MissingGeocodeParameters,
    UnknownCityId,
    UnknownPath,
    InvalidApiKey,
    JsonpCallback,
}

impl Scenario {
    pub fn all() -> Vec<Scenario> {
        let mut all: Vec<Scenario> = UnitSystem::all()
            .iter()
            .copied()
            .map(Scenario::WeatherByCityId)
            .collect();
        all.extend([
            Scenario::WeatherByLatLon,
            Scenario::WeatherByMode(ResponseMode::Xml),
            Scenario::WeatherByMode(ResponseMode::Html),
            Scenario::TranslatedDescription,
            Scenario::MissingGeocodeParameters,
            Scenario::UnknownCityId,
            Scenario::UnknownPath,
            Scenario::InvalidApiKey,
            Scenario::JsonpCallback,
        ]);
        all
    }

    /// Scenarios whose name contains `pattern`; all of them when `None`.
    pub fn matching(pattern: Option<&str>) -> Vec<Scenario> {
        Self::all()
            .into_iter()
            .filter(|s| pattern.is_none_or(|p| s.name().contains(p)))
            .collect()
    }

    /// Report key.
    pub fn name(&self) -> String {
        match self {
            Scenario::WeatherByCityId(unit) => {
                format!("weather_by_city_id_{unit}_returns_valid_data")
            }
            Scenario::WeatherByLatLon => {
                "weather_by_lat_lon_returns_valid_data_in_standard_units".into()
            }
            Scenario::WeatherByMode(mode) => {
                let mode = mode.as_str();
                format!("weather_by_city_id_{mode}_mode_returns_{mode}")
            }
            Scenario::TranslatedDescription => {
                "weather_by_lat_lon_with_language_returns_translated_description".into()
            }
            Scenario::MissingGeocodeParameters => {
                "weather_without_geocode_parameters_returns_bad_request".into()
            }
            Scenario::UnknownCityId => "weather_by_unknown_city_id_returns_not_found".into(),
            Scenario::UnknownPath => "unknown_path_returns_not_found".into(),
            Scenario::InvalidApiKey => "weather_with_invalid_api_key_returns_unauthorized".into(),
            Scenario::JsonpCallback => "weather_with_callback_returns_jsonp".into(),
        }
    }

    pub async fn run(&self, ctx: &RunContext) -> Result<()> {
        let subject = ctx.subject();
        let client = ctx.client();
        let by_id = format!("weather?id={}", subject.id);
        let by_coord = format!("weather?lat={}&lon={}", subject.coord.lat, subject.coord.lon);

        match *self {
            Scenario::WeatherByCityId(unit) => {
                let res = client.get(&format!("{by_id}&units={unit}")).await?;
                expect::status(&res, StatusCode::OK)?;
                expect::content_type(&res, JSON)?;
                let weather: WeatherResponse = res.json("WeatherResponse")?;
                expect::equal("City name", subject.name.as_str(), weather.name.as_str())?;
                validate(&weather, unit, subject)?;
            }
            Scenario::WeatherByLatLon => {
                let res = client.get(&by_coord).await?;
                expect::status(&res, StatusCode::OK)?;
                let weather: WeatherResponse = res.json("WeatherResponse")?;
                expect::equal("City name", subject.name.as_str(), weather.name.as_str())?;
                validate(&weather, UnitSystem::Standard, subject)?;
            }
            Scenario::WeatherByMode(mode) => {
                let res = client.get(&format!("{by_id}&mode={}", mode.as_str())).await?;
                expect::status(&res, StatusCode::OK)?;
                expect::content_type(&res, mode.content_type())?;
            }
            Scenario::TranslatedDescription => {
                let (first, second) = LANGUAGES;
                let res_first = client.get(&format!("{by_coord}&lang={first}")).await?;
                let res_second = client
                    .get(&format!("{by_coord}&units=metric&lang={second}"))
                    .await?;
                expect::status(&res_first, StatusCode::OK)?;
                expect::status(&res_second, StatusCode::OK)?;

                let weather_first: WeatherResponse = res_first.json("WeatherResponse")?;
                let weather_second: WeatherResponse = res_second.json("WeatherResponse")?;

                let a = weather_first.first_description().unwrap_or_default();
                let b = weather_second.first_description().unwrap_or_default();
                if a == b {
                    return Err(HarnessError::Assertion(format!(
                        "Description is not translated: '{first}' and '{second}' both returned '{a}'"
                    )));
                }
                validate(&weather_second, UnitSystem::Metric, subject)?;
            }
            Scenario::MissingGeocodeParameters => {
                let res = client.get("weather?").await?;
                expect::error_body(&res, StatusCode::BAD_REQUEST, &nothing_to_geocode())?;
            }
            Scenario::UnknownCityId => {
                let res = client.get(&format!("weather?id={UNKNOWN_CITY_ID}")).await?;
                expect::error_body(&res, StatusCode::NOT_FOUND, &city_not_found())?;
            }
            Scenario::UnknownPath => {
                let res = client.get(UNKNOWN_PATH).await?;
                expect::error_body(&res, StatusCode::NOT_FOUND, &internal_error())?;
            }
            Scenario::InvalidApiKey => {
                let bad_client = ctx.client_with_key(INVALID_API_KEY)?;
                let res = bad_client.get(&by_id).await?;
                expect::error_body(&res, StatusCode::UNAUTHORIZED, &invalid_api_key())?;
            }
            Scenario::JsonpCallback => {
                let res = client.get(&format!("{by_id}&callback={CALLBACK}")).await?;
                expect::status(&res, StatusCode::OK)?;
                expect::content_type(&res, JSONP)?;
                let json = expect::unwrap_jsonp(&res.body, CALLBACK)?;
                let weather: WeatherResponse =
                    from_json_case_insensitive(json).map_err(|e| HarnessError::SchemaMismatch {
                        expected: "WeatherResponse",
                        reason: e.to_string(),
                    })?;
                validate(&weather, UnitSystem::Standard, subject)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn twelve_scenarios_with_unique_names() {
        let all = Scenario::all();
        assert_eq!(all.len(), 12);
        let names: HashSet<String> = all.iter().map(Scenario::name).collect();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn unit_and_mode_names() {
        assert_eq!(
            Scenario::WeatherByCityId(UnitSystem::Imperial).name(),
            "weather_by_city_id_imperial_returns_valid_data"
        );
        assert_eq!(
            Scenario::WeatherByMode(ResponseMode::Xml).name(),
            "weather_by_city_id_xml_mode_returns_xml"
        );
    }

    #[test]
    fn filter_selects_by_substring() {
        let found = Scenario::matching(Some("not_found"));
        assert_eq!(found, vec![Scenario::UnknownCityId, Scenario::UnknownPath]);
        assert_eq!(Scenario::matching(None).len(), 12);
        assert!(Scenario::matching(Some("nothing-matches")).is_empty());
    }

    #[test]
    fn the_two_not_found_messages_differ() {
        assert_ne!(city_not_found().message, internal_error().message);
        assert_eq!(city_not_found().cod, internal_error().cod);
    }
}
