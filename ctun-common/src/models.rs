//! Context and recommendation value types
//!
//! These types cross crate boundaries: they are produced by the signal
//! providers, carried inside the context snapshot, and published on the
//! event bus.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances (meters)
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Device location fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in degrees (-90..=90)
    pub lat: f64,
    /// Longitude in degrees (-180..=180)
    pub lon: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy_m: f32,
}

impl LocationFix {
    pub fn new(lat: f64, lon: f64, accuracy_m: f32) -> Self {
        Self { lat, lon, accuracy_m }
    }

    /// True when coordinates are finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
            && self.accuracy_m >= 0.0
    }

    /// Great-circle distance to another coordinate pair (haversine, meters)
    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        let (phi1, phi2) = (self.lat.to_radians(), lat.to_radians());
        let d_phi = (lat - self.lat).to_radians();
        let d_lambda = (lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Nearby place reported by a places lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Human-readable category ("cafe", "gym", "school", ...)
    pub category: String,
    pub distance_meters: f64,
}

/// Coarse weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Foggy,
    Unknown,
}

/// Current weather at the device location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub condition: WeatherCondition,
    pub temperature_c: f64,
}

/// One track suggestion returned by the recommendation service
///
/// Lists of recommendations keep the service's relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub track_title: String,
    pub artist: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    pub rationale: String,
}

/// How many signal sources contributed to a context snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Completeness {
    /// All four sources succeeded
    Full,
    /// More than one source, but not all four
    Partial,
    /// Exactly one source
    Minimal,
}

/// Recommendation request lifecycle state
///
/// IDLE → AGGREGATING → REQUESTING → DELIVERED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestState {
    Idle,
    Aggregating,
    Requesting,
    Delivered,
    Failed,
}

impl RequestState {
    /// A request in this state holds the orchestrator
    pub fn is_active(&self) -> bool {
        matches!(self, RequestState::Aggregating | RequestState::Requesting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Delivered | RequestState::Failed)
    }

    /// Whether `self → next` is an edge of the request state machine
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Aggregating)
                | (Aggregating, Requesting)
                | (Aggregating, Failed)
                | (Requesting, Delivered)
                | (Requesting, Failed)
                | (Delivered, Idle)
                | (Failed, Idle)
        )
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RequestState::Idle => "IDLE",
            RequestState::Aggregating => "AGGREGATING",
            RequestState::Requesting => "REQUESTING",
            RequestState::Delivered => "DELIVERED",
            RequestState::Failed => "FAILED",
        };
        f.write_str(label)
    }
}
