use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub geocoder: GeocoderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    /// Row cap sent to Socrata endpoints, which otherwise return 1000 rows
    pub row_limit: Option<u64>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub min_delay_ms: u64,
    pub timeout_seconds: u64,
    pub country: String,
    pub municipality_column: String,
    pub department_column: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: String,
    pub log_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            row_limit: None,
            timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
            min_delay_ms: constants::DEFAULT_MIN_DELAY_MS,
            timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT_SECONDS,
            country: constants::DEFAULT_COUNTRY.to_string(),
            municipality_column: constants::MUNICIPALITY_COLUMN.to_string(),
            department_column: constants::DEPARTMENT_COLUMN.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: constants::DEFAULT_OUTPUT_FILE.to_string(),
            log_dir: constants::DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl GeocoderConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment (and `.env`, once loaded).
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = lookup("DATAGOV_ENDPOINT") {
            self.source.endpoint = Some(endpoint);
        }
        if let Some(output) = lookup("DATAGOV_OUTPUT") {
            self.output.csv_path = output;
        }
        if let Some(url) = lookup("NOMINATIM_URL") {
            self.geocoder.base_url = url;
        }
        if let Some(agent) = lookup("NOMINATIM_USER_AGENT") {
            self.geocoder.user_agent = agent;
        }
        if let Some(delay) = lookup("GEOCODER_MIN_DELAY_MS") {
            self.geocoder.min_delay_ms = delay.parse().map_err(|_| {
                PipelineError::Config(format!("GEOCODER_MIN_DELAY_MS is not a number: {}", delay))
            })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.geocoder.user_agent.trim().is_empty() {
            return Err(PipelineError::Config(
                "geocoder.user_agent must not be empty".to_string(),
            ));
        }
        if self.geocoder.municipality_column == self.geocoder.department_column {
            return Err(PipelineError::Config(
                "geocoder municipality and department columns must differ".to_string(),
            ));
        }
        Ok(())
    }
}
