use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the static city catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    pub coord: Coordinates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainMetrics {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub main: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemInfo {
    pub country: String,
}

/// Successful `/weather` body, as far as the harness checks it.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherResponse {
    pub id: u64,
    pub name: String,
    pub coord: Coordinates,
    pub main: MainMetrics,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    pub sys: SystemInfo,
    /// Status code the API embeds in the body.
    pub cod: i64,
}

impl WeatherResponse {
    pub fn first_description(&self) -> Option<&str> {
        self.weather.first().map(|w| w.description.as_str())
    }
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub cod: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(cod: &str, message: &str) -> Self {
        Self {
            cod: cod.to_string(),
            message: message.to_string(),
        }
    }
}

/// Decode JSON ignoring the case of object keys.
pub fn from_json_case_insensitive<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let value: Value = serde_json::from_str(text)?;
    serde_json::from_value(lowercase_keys(value))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
