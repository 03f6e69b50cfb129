//! Core library for the `weather-conformance` harness.
//!
//! This crate defines:
//! - Configuration & run settings
//! - The authenticated test client and its credential middleware
//! - The city catalog and subject selection
//! - Response validation per unit system
//! - Run fixtures, scenarios and the run report
//!
//! It is used by `weather-conformance-cli`, but scenarios can also be driven
//! directly from integration tests.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fixture;
pub mod model;
pub mod report;
pub mod scenario;
pub mod units;
pub mod validate;

pub use catalog::CityCatalog;
pub use client::{ApiResponse, ClientFactory, WeatherClient};
pub use config::{Config, RunSettings};
pub use error::HarnessError;
pub use fixture::{RunContext, Suite};
pub use model::{CityRecord, Coordinates, ErrorResponse, WeatherResponse};
pub use report::{ReportFormat, RunReport};
pub use scenario::Scenario;
pub use units::{ResponseMode, UnitSystem};
pub use validate::{ValidationFailure, Violation, validate};
