//! YAML configuration, read from the `WeatherData:` section of a settings file.

use crate::store::persistence::StoreFormat;
use crate::types::provider_kind::ProviderKind;
use crate::utils::get_cache_dir;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse weather configuration")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "WeatherData")]
    weather_data: WeatherConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub service: ProviderKind,
    /// Provider station code. Falls back to the provider's default station.
    pub station: Option<String>,
    pub timezone: Tz,
    /// Directory holding the store file. Falls back to the system cache dir.
    pub base_dir: Option<PathBuf>,
    pub file_descriptor: String,
    pub file_format: StoreFormat,
    pub representative_hour: u32,
    /// `None` spawns every fetch at once.
    pub max_concurrency: Option<usize>,
    pub request_timeout_secs: u64,
    pub batch_timeout_secs: Option<u64>,
    pub autosave: bool,
    pub keyring_service: String,
    pub base_url: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            service: ProviderKind::Aemet,
            station: None,
            timezone: chrono_tz::Europe::Madrid,
            base_dir: None,
            file_descriptor: "weather".to_string(),
            file_format: StoreFormat::Csv,
            representative_hour: 12,
            max_concurrency: Some(8),
            request_timeout_secs: 30,
            batch_timeout_secs: None,
            autosave: true,
            keyring_service: "system".to_string(),
            base_url: None,
        }
    }
}

impl WeatherConfig {
    pub fn new(service: ProviderKind) -> Self {
        Self {
            service,
            ..Self::default()
        }
    }

    /// Parses the `WeatherData` section of a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(yaml)?;
        file.weather_data.validate()?;
        Ok(file.weather_data)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.representative_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "representative_hour must be below 24, got {}",
                self.representative_hour
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.file_descriptor.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "file_descriptor must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn station(&self) -> &str {
        self.station
            .as_deref()
            .unwrap_or_else(|| self.service.default_station())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.service.default_base_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_secs.map(Duration::from_secs)
    }

    /// `{base_dir}/{file_descriptor}_{station}.{csv|parquet}`.
    pub fn store_path(&self) -> std::io::Result<PathBuf> {
        let dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => get_cache_dir()?,
        };
        Ok(dir.join(format!(
            "{}_{}.{}",
            self.file_descriptor,
            self.station(),
            self.file_format.extension()
        )))
    }
}
