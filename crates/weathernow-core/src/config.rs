use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "WEATHERNOW_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature unit requested from the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Query parameter value understood by Open-Meteo
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// The other unit
    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

/// Wind speed unit requested from the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindSpeedUnit {
    #[default]
    Kmh,
    Mph,
    Ms,
    Kn,
}

impl WindSpeedUnit {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Kmh => "kmh",
            Self::Mph => "mph",
            Self::Ms => "ms",
            Self::Kn => "kn",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kmh => "km/h",
            Self::Mph => "mph",
            Self::Ms => "m/s",
            Self::Kn => "kn",
        }
    }

    /// Next unit in the kmh -> mph -> m/s -> kn cycle
    pub fn cycled(self) -> Self {
        match self {
            Self::Kmh => Self::Mph,
            Self::Mph => Self::Ms,
            Self::Ms => Self::Kn,
            Self::Kn => Self::Kmh,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Weather and unit preferences
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Place search behaviour
    #[serde(default)]
    pub search: SearchConfig,

    /// Upstream API endpoints
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Optional local language model for activity briefs
    #[serde(default)]
    pub advisory: AdvisoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    #[serde(default)]
    pub wind_speed_unit: WindSpeedUnit,

    /// HTTP timeout applied to geocoding and forecast requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed "my location" latitude, used when no system location is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_longitude: Option<f64>,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::default(),
            wind_speed_unit: WindSpeedUnit::default(),
            request_timeout_secs: default_request_timeout_secs(),
            home_latitude: None,
            home_longitude: None,
        }
    }
}

impl WeatherConfig {
    /// Configured home coordinates, only when both halves are present
    pub fn home_coordinates(&self) -> Option<(f64, f64)> {
        Some((self.home_latitude?, self.home_longitude?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a lookup is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum trimmed query length that triggers a lookup
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    #[serde(default = "default_result_count")]
    pub result_count: u32,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_debounce_ms() -> u64 {
    350
}

fn default_min_query_chars() -> usize {
    2
}

fn default_result_count() -> u32 {
    8
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
            result_count: default_result_count(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
        }
    }
}

/// Local inference server speaking the OpenAI chat completions protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_advisory_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_advisory_model")]
    pub model: String,

    #[serde(default = "default_advisory_temperature")]
    pub temperature: f32,

    #[serde(default = "default_advisory_max_tokens")]
    pub max_tokens: u32,
}

fn default_advisory_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_advisory_model() -> String {
    "qwen2.5-0.5b-instruct".to_string()
}

fn default_advisory_temperature() -> f32 {
    0.6
}

fn default_advisory_max_tokens() -> u32 {
    220
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_advisory_endpoint(),
            model: default_advisory_model(),
            temperature: default_advisory_temperature(),
            max_tokens: default_advisory_max_tokens(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file is not an error; defaults are returned and nothing is
    /// written to disk.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.endpoints.geocoding_url,
            "endpoints.geocoding_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.forecast_url,
            "endpoints.forecast_url",
            &mut result,
        );

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        match (self.weather.home_latitude, self.weather.home_longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("weather.home_latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error(
                        "weather.home_longitude",
                        "Longitude must be within -180..180",
                    );
                }
            }
            (None, None) => {}
            _ => result.add_warning(
                "weather",
                "Only one of home_latitude/home_longitude is set - fixed location disabled",
            ),
        }

        if self.search.debounce_ms == 0 {
            result.add_warning(
                "search.debounce_ms",
                "Debounce disabled - every keystroke issues a lookup",
            );
        }

        if self.search.min_query_chars == 0 {
            result.add_error("search.min_query_chars", "Minimum query length must be at least 1");
        }

        if !(1..=100).contains(&self.search.result_count) {
            result.add_error("search.result_count", "Result count must be within 1..100");
        }

        if self.search.language.trim().is_empty() {
            result.add_error("search.language", "Language must not be empty");
        }

        if self.advisory.enabled {
            self.validate_url(&self.advisory.endpoint, "advisory.endpoint", &mut result);
            if self.advisory.model.trim().is_empty() {
                result.add_error("advisory.model", "Model name must not be empty");
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weathernow");

        Ok(config_dir.join("config.toml"))
    }
}
