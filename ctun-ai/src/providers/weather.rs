//! Weather signal provider
//!
//! # API Reference
//! - Endpoint: https://api.openweathermap.org/data/2.5/weather
//! - Documentation: https://openweathermap.org/current

use super::location::LocationFeed;
use crate::types::{ProviderResult, SignalProvider};
use async_trait::async_trait;
use ctun_common::models::{LocationFix, WeatherCondition, WeatherReport};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Map an OpenWeatherMap condition group to a [`WeatherCondition`]
///
/// `main` is the condition group (`weather[0].main`); `description` is only
/// consulted when the group is not recognized.
pub fn map_condition(main: &str, description: &str) -> WeatherCondition {
    match main.to_lowercase().as_str() {
        "clear" => WeatherCondition::Sunny,
        "clouds" => WeatherCondition::Cloudy,
        "rain" | "drizzle" | "thunderstorm" => WeatherCondition::Rainy,
        "snow" => WeatherCondition::Snowy,
        "mist" | "fog" | "haze" => WeatherCondition::Foggy,
        _ => {
            let description = description.to_lowercase();
            if description.contains("rain") || description.contains("storm") {
                WeatherCondition::Rainy
            } else if description.contains("cloud") {
                WeatherCondition::Cloudy
            } else if description.contains("clear") || description.contains("sun") {
                WeatherCondition::Sunny
            } else {
                WeatherCondition::Unknown
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    main: Option<MainBlock>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

impl CurrentWeatherResponse {
    fn into_report(self) -> Result<WeatherReport, String> {
        let entry = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| "weather response has no condition entries".to_string())?;
        let main = self
            .main
            .ok_or_else(|| "weather response has no main block".to_string())?;

        Ok(WeatherReport {
            condition: map_condition(&entry.main, &entry.description),
            temperature_c: main.temp,
        })
    }
}

/// OpenWeatherMap current-conditions lookup keyed by the latest location fix
pub struct OpenWeatherProvider {
    http_client: Client,
    endpoint: String,
    api_key: String,
    feed: LocationFeed,
}

impl OpenWeatherProvider {
    pub fn new(
        http_client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        feed: LocationFeed,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            feed,
        }
    }

    /// Query current weather at `origin`
    pub async fn current(&self, origin: &LocationFix) -> Result<WeatherReport, String> {
        let lat = origin.lat.to_string();
        let lon = origin.lon.to_string();

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| format!("weather request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("weather API returned HTTP {}", status.as_u16()));
        }

        let parsed: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse weather response: {}", e))?;

        let report = parsed.into_report()?;
        debug!(condition = ?report.condition, temperature_c = report.temperature_c, "Weather resolved");
        Ok(report)
    }
}

#[async_trait]
impl SignalProvider<WeatherReport> for OpenWeatherProvider {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn fetch(&self) -> ProviderResult<WeatherReport> {
        let origin = match self.feed.current_fix() {
            Ok(fix) => fix,
            Err(reason) => return ProviderResult::Failure(reason),
        };

        match self.current(&origin).await {
            Ok(report) => ProviderResult::Success(report),
            Err(reason) => {
                warn!(provider = "weather", reason = %reason, "Weather lookup failed");
                ProviderResult::Failure(reason)
            }
        }
    }
}
