use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::report::ReportFormat;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/";
pub const DEFAULT_CATALOG_PATH: &str = "testdata/city.list.json";
pub const DEFAULT_REPORT_PATH: &str = "conformance-report.md";

pub const ENV_API_KEY: &str = "OWM_API_KEY";
pub const ENV_BASE_URL: &str = "OWM_BASE_URL";
pub const ENV_CATALOG_PATH: &str = "OWM_CATALOG_PATH";

/// Settings stored on disk. Every field is optional; unset fields fall back
/// to the environment and then to built-in defaults.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://api.openweathermap.org/data/2.5/"
/// catalog_path = "testdata/city.list.json"
/// report_format = "markdown"
/// concurrency = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub report_format: Option<ReportFormat>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved, validated inputs for one run.
#[derive(Clone, PartialEq)]
pub struct RunSettings {
    pub api_key: String,
    pub base_url: Url,
    pub catalog_path: PathBuf,
    pub report_path: PathBuf,
    pub report_format: ReportFormat,
    pub concurrency: usize,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("catalog_path", &self.catalog_path)
            .field("report_path", &self.report_path)
            .field("report_format", &self.report_format)
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-conformance", "weather-conformance")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Fill unset fields from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(path) = lookup(ENV_CATALOG_PATH) {
            self.catalog_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Overlay `other` on top of `self`: set fields in `other` win.
    pub fn merge(self, other: Config) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            base_url: other.base_url.or(self.base_url),
            catalog_path: other.catalog_path.or(self.catalog_path),
            report_path: other.report_path.or(self.report_path),
            report_format: other.report_format.or(self.report_format),
            concurrency: other.concurrency.or(self.concurrency),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }

    /// Validate and apply defaults.
    pub fn resolve(self) -> Result<RunSettings> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `weather-conformance configure`, set {ENV_API_KEY}, \
                     or pass --api-key."
                )
            })?;

        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("Base URL must use http or https: {base_url}"));
        }

        let concurrency = self.concurrency.unwrap_or(1);
        if concurrency == 0 {
            return Err(anyhow!("Concurrency must be at least 1"));
        }

        let report_format = self.report_format.unwrap_or_default();
        let report_path = self.report_path.unwrap_or_else(|| {
            PathBuf::from(DEFAULT_REPORT_PATH).with_extension(report_format.extension())
        });
        let catalog_path = self
            .catalog_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));

        Ok(RunSettings {
            api_key,
            base_url,
            catalog_path,
            report_path,
            report_format,
            concurrency,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}
