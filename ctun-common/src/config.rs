//! Configuration loading and API key resolution
//!
//! Bootstrap configuration lives in a TOML file
//! (`<config_dir>/contexttunes/ctun-ai.toml` by default). A missing file is
//! not fatal: compiled defaults are used and a warning is logged.
//!
//! API keys resolve with priority Environment → TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable for the recommendation service key
pub const ENV_RECOMMENDATION_API_KEY: &str = "CTUN_RECOMMENDATION_API_KEY";
/// Environment variable for the places lookup key
pub const ENV_PLACES_API_KEY: &str = "CTUN_PLACES_API_KEY";
/// Environment variable for the weather lookup key
pub const ENV_WEATHER_API_KEY: &str = "CTUN_WEATHER_API_KEY";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Bearer key for the recommendation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_api_key: Option<String>,

    /// Google Places API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_api_key: Option<String>,

    /// OpenWeatherMap API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// User-tagged locations (Home, Gym, Office, ...)
    #[serde(default)]
    pub tagged_locations: Vec<TaggedLocation>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Remote service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_recommendation_url")]
    pub recommendation_url: String,
    #[serde(default = "default_places_url")]
    pub places_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            recommendation_url: default_recommendation_url(),
            places_url: default_places_url(),
            weather_url: default_weather_url(),
        }
    }
}

/// Pipeline timing and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Per-provider timeout for location/places/weather
    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,
    /// Timeout for reading the captured frame
    #[serde(default = "default_signal_timeout_ms")]
    pub image_timeout_ms: u64,
    /// Retries after the first attempt for transient service failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Relative jitter applied to each backoff delay (0.2 = ±20%)
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,
    /// Nearby-search radius in meters
    #[serde(default = "default_places_radius_m")]
    pub places_radius_m: f64,
    /// Geofence radius for tagged locations in meters
    #[serde(default = "default_geofence_radius_m")]
    pub geofence_radius_m: f64,
    /// Event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Outbound request cap for the recommendation service (unlimited when unset)
    #[serde(default)]
    pub recommendation_rate_per_second: Option<u32>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            signal_timeout_ms: default_signal_timeout_ms(),
            image_timeout_ms: default_signal_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            backoff_jitter: default_backoff_jitter(),
            places_radius_m: default_places_radius_m(),
            geofence_radius_m: default_geofence_radius_m(),
            event_capacity: default_event_capacity(),
            recommendation_rate_per_second: None,
        }
    }
}

/// Location the user has explicitly tagged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_recommendation_url() -> String {
    "https://api.contexttunes.app/v1/recommendations".to_string()
}

fn default_places_url() -> String {
    "https://places.googleapis.com/v1/places:searchNearby".to_string()
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_signal_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_backoff_jitter() -> f64 {
    0.2
}

fn default_places_radius_m() -> f64 {
    300.0
}

fn default_geofence_radius_m() -> f64 {
    100.0
}

fn default_event_capacity() -> usize {
    100
}

/// Resolved API keys handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeys {
    pub recommendation: String,
    /// Places lookup is skipped (reported as failure) without a key
    pub places: Option<String>,
    /// Weather lookup is skipped (reported as failure) without a key
    pub weather: Option<String>,
}

impl TomlConfig {
    /// Resolve all API keys (Environment → TOML)
    ///
    /// Only the recommendation key is mandatory.
    pub fn resolve_api_keys(&self) -> Result<ApiKeys> {
        let recommendation = resolve_api_key(
            ENV_RECOMMENDATION_API_KEY,
            self.recommendation_api_key.as_deref(),
            "recommendation",
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "Recommendation API key not configured. Please configure using one of:\n\
                 1. Environment: {}=your-key-here\n\
                 2. TOML config: recommendation_api_key = \"your-key\"",
                ENV_RECOMMENDATION_API_KEY
            ))
        })?;

        let places = resolve_api_key(ENV_PLACES_API_KEY, self.places_api_key.as_deref(), "places");
        if places.is_none() {
            warn!("Places API key not configured; nearby places will be unavailable");
        }

        let weather =
            resolve_api_key(ENV_WEATHER_API_KEY, self.weather_api_key.as_deref(), "weather");
        if weather.is_none() {
            warn!("Weather API key not configured; weather will be unavailable");
        }

        Ok(ApiKeys {
            recommendation,
            places,
            weather,
        })
    }
}

/// Resolve one API key from environment then TOML
///
/// Warns when both sources define a valid key (environment wins).
pub fn resolve_api_key(env_var: &str, toml_value: Option<&str>, label: &str) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env), Some(_)) => {
            warn!(
                key = label,
                "API key found in both environment and TOML. Using environment (highest priority)."
            );
            Some(env)
        }
        (Some(env), None) => {
            info!(key = label, "API key loaded from environment variable");
            Some(env)
        }
        (None, Some(toml)) => {
            info!(key = label, "API key loaded from TOML config");
            Some(toml.to_string())
        }
        (None, None) => None,
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("contexttunes").join("ctun-ai.toml"))
}

/// Load TOML configuration
///
/// A missing file yields compiled defaults with a warning; a present but
/// unreadable or malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    validate(&config)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

fn validate(config: &TomlConfig) -> Result<()> {
    let p = &config.pipeline;
    if p.signal_timeout_ms == 0 || p.image_timeout_ms == 0 {
        return Err(Error::Config("Provider timeouts must be greater than zero".to_string()));
    }
    if p.backoff_factor < 1.0 {
        return Err(Error::Config(format!(
            "backoff_factor must be >= 1.0 (got {})",
            p.backoff_factor
        )));
    }
    if !(0.0..1.0).contains(&p.backoff_jitter) {
        return Err(Error::Config(format!(
            "backoff_jitter must be in [0.0, 1.0) (got {})",
            p.backoff_jitter
        )));
    }
    if p.event_capacity == 0 {
        return Err(Error::Config("event_capacity must be greater than zero".to_string()));
    }
    if p.recommendation_rate_per_second == Some(0) {
        return Err(Error::Config(
            "recommendation_rate_per_second must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

/// Write TOML configuration atomically (temp file + rename)
///
/// The file holds API keys, so permissions are restricted to 0600 on Unix.
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, target)?;
    Ok(())
}
