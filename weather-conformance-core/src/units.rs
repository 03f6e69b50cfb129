use std::{convert::TryFrom, fmt};

/// Measurement convention selected with the `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSystem {
    Metric,
    Imperial,
    Standard,
}

/// Closed interval of accepted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
            UnitSystem::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[
            UnitSystem::Metric,
            UnitSystem::Imperial,
            UnitSystem::Standard,
        ]
    }

    /// Celsius, Fahrenheit and Kelvin bounds respectively.
    pub const fn temperature_range(&self) -> Bounds {
        match self {
            UnitSystem::Metric => Bounds {
                min: -50.0,
                max: 50.0,
            },
            UnitSystem::Imperial => Bounds {
                min: -60.0,
                max: 130.0,
            },
            UnitSystem::Standard => Bounds {
                min: 180.0,
                max: 323.0,
            },
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            "standard" => Ok(UnitSystem::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial, standard."
            )),
        }
    }
}

/// Non-JSON representations selected with the `mode` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseMode {
    Xml,
    Html,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Xml => "xml",
            ResponseMode::Html => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseMode::Xml => "application/xml",
            ResponseMode::Html => "text/html",
        }
    }
}
