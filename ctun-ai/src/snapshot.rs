//! Context snapshot and recommendation request payload
//!
//! A [`ContextSnapshot`] is built once per request from the four provider
//! results. Construction fails with `InsufficientContext` when no source
//! succeeded, so an empty snapshot can never reach the recommendation client.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageFrame, ProviderResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use ctun_common::models::{Completeness, LocationFix, Place, WeatherReport};
use serde::Serialize;

/// Classify completeness from which sources succeeded
///
/// - FULL: all four
/// - PARTIAL: two or three (includes image plus any other source)
/// - MINIMAL: exactly one
/// - `None`: zero sources
pub fn classify(image: bool, location: bool, places: bool, weather: bool) -> Option<Completeness> {
    let count = [image, location, places, weather]
        .iter()
        .filter(|present| **present)
        .count();

    match count {
        0 => None,
        1 => Some(Completeness::Minimal),
        4 => Some(Completeness::Full),
        _ => Some(Completeness::Partial),
    }
}

/// Merged, partially-present bundle of context signals for one request
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    image: Option<ImageFrame>,
    location: Option<LocationFix>,
    nearby_places: Option<Vec<Place>>,
    weather: Option<WeatherReport>,
    timestamp: DateTime<Utc>,
    completeness: Completeness,
}

impl ContextSnapshot {
    /// Build a snapshot from present values
    ///
    /// `nearby_places` is `Some` whenever the places lookup succeeded, even
    /// with an empty list.
    pub fn new(
        image: Option<ImageFrame>,
        location: Option<LocationFix>,
        nearby_places: Option<Vec<Place>>,
        weather: Option<WeatherReport>,
    ) -> PipelineResult<Self> {
        let completeness = classify(
            image.is_some(),
            location.is_some(),
            nearby_places.is_some(),
            weather.is_some(),
        )
        .ok_or_else(|| {
            PipelineError::InsufficientContext("all sources absent".to_string())
        })?;

        Ok(Self {
            image,
            location,
            nearby_places,
            weather,
            timestamp: Utc::now(),
            completeness,
        })
    }

    /// Build a snapshot from raw provider results
    ///
    /// The `InsufficientContext` message lists why each provider is absent.
    pub fn from_results(
        image: ProviderResult<ImageFrame>,
        location: ProviderResult<LocationFix>,
        places: ProviderResult<Vec<Place>>,
        weather: ProviderResult<WeatherReport>,
    ) -> PipelineResult<Self> {
        let any_success = image.is_success()
            || location.is_success()
            || places.is_success()
            || weather.is_success();

        if !any_success {
            let summary = [
                ("image", image.detail()),
                ("location", location.detail()),
                ("places", places.detail()),
                ("weather", weather.detail()),
            ]
            .into_iter()
            .map(|(name, detail)| format!("{}: {}", name, detail.unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("; ");
            return Err(PipelineError::InsufficientContext(summary));
        }

        Self::new(
            image.into_option(),
            location.into_option(),
            places.into_option(),
            weather.into_option(),
        )
    }

    pub fn image(&self) -> Option<&ImageFrame> {
        self.image.as_ref()
    }

    pub fn location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    /// Nearby places in provider order (empty when the lookup failed)
    pub fn nearby_places(&self) -> &[Place] {
        self.nearby_places.as_deref().unwrap_or(&[])
    }

    pub fn has_places(&self) -> bool {
        self.nearby_places.is_some()
    }

    pub fn weather(&self) -> Option<&WeatherReport> {
        self.weather.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    /// Number of sources that contributed
    pub fn source_count(&self) -> usize {
        [
            self.image.is_some(),
            self.location.is_some(),
            self.nearby_places.is_some(),
            self.weather.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Request payload embedding only the present fields
    pub fn to_request(&self) -> RecommendationRequest<'_> {
        RecommendationRequest {
            image: self.image.as_ref().map(|frame| STANDARD.encode(frame.as_bytes())),
            location: self.location.map(|fix| LocationPayload {
                lat: fix.lat,
                lon: fix.lon,
            }),
            places: self.nearby_places.as_deref(),
            weather: self.weather.as_ref(),
        }
    }
}

/// JSON body POSTed to the recommendation service
///
/// Absent signals are omitted keys, never `null`.
#[derive(Debug, Serialize)]
pub struct RecommendationRequest<'a> {
    /// Base64-encoded captured frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places: Option<&'a [Place]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<&'a WeatherReport>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LocationPayload {
    pub lat: f64,
    pub lon: f64,
}
