//! Places signal providers
//!
//! # API Reference
//! - Endpoint: https://places.googleapis.com/v1/places:searchNearby
//! - Documentation: https://developers.google.com/maps/documentation/places/web-service/nearby-search

use super::location::LocationFeed;
use crate::types::{ProviderResult, SignalProvider};
use async_trait::async_trait;
use ctun_common::config::TaggedLocation;
use ctun_common::models::{LocationFix, Place};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Place types relevant for context-aware music
pub const INCLUDED_TYPES: [&str; 11] = [
    "library",
    "school",
    "university",
    "park",
    "restaurant",
    "pub",
    "bar",
    "cafe",
    "gym",
    "stadium",
    "beach",
];

/// Maximum number of places requested per lookup
const MAX_RESULT_COUNT: u32 = 10;

/// Response fields requested from the Places API
const FIELD_MASK: &str = "places.id,places.displayName,places.primaryType,places.types,places.location";

/// Category reported for user-tagged locations
pub const TAGGED_CATEGORY: &str = "tagged";

/// Convert a Places API type into a human-readable category
pub fn readable_category(place_type: &str) -> String {
    match place_type {
        "school" | "university" => "school",
        "bar" | "night_club" => "nightlife",
        "gym" | "stadium" => "gym",
        "store" | "shopping_mall" => "shopping",
        other => other,
    }
    .to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchNearbyRequest<'a> {
    included_types: &'a [&'a str],
    max_result_count: u32,
    rank_preference: &'static str,
    location_restriction: LocationRestriction,
}

#[derive(Debug, Serialize)]
struct LocationRestriction {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchNearbyResponse {
    /// Omitted entirely when nothing matched
    #[serde(default)]
    places: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceResult {
    display_name: Option<LocalizedText>,
    primary_type: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

impl PlaceResult {
    /// Convert to a [`Place`]; results without a name or position are dropped
    fn into_place(self, origin: &LocationFix) -> Option<Place> {
        let name = self.display_name?.text;
        let position = self.location?;

        let place_type = self
            .primary_type
            .or_else(|| {
                self.types
                    .into_iter()
                    .find(|t| INCLUDED_TYPES.contains(&t.as_str()))
            })
            .unwrap_or_else(|| "place".to_string());

        Some(Place {
            name,
            category: readable_category(&place_type),
            distance_meters: origin.distance_to(position.latitude, position.longitude),
        })
    }
}

/// Google Places nearby search keyed by the latest location fix
pub struct NearbyPlacesProvider {
    http_client: Client,
    endpoint: String,
    api_key: String,
    feed: LocationFeed,
    radius_m: f64,
}

impl NearbyPlacesProvider {
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
            radius_m: 300.0,
        }
    }

    /// Set search radius in meters (default: 300)
    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Query nearby places around `origin`, nearest first
    pub async fn search(&self, origin: &LocationFix) -> Result<Vec<Place>, String> {
        let request = SearchNearbyRequest {
            included_types: &INCLUDED_TYPES,
            max_result_count: MAX_RESULT_COUNT,
            rank_preference: "DISTANCE",
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: LatLng {
                        latitude: origin.lat,
                        longitude: origin.lon,
                    },
                    radius: self.radius_m,
                },
            },
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("places request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("places API returned HTTP {}: {}", status.as_u16(), body));
        }

        let parsed: SearchNearbyResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse places response: {}", e))?;

        let mut places: Vec<Place> = parsed
            .places
            .into_iter()
            .filter_map(|result| result.into_place(origin))
            .collect();
        places.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        debug!(count = places.len(), radius_m = self.radius_m, "Nearby places resolved");
        Ok(places)
    }
}

#[async_trait]
impl SignalProvider<Vec<Place>> for NearbyPlacesProvider {
    fn name(&self) -> &'static str {
        "places"
    }

    async fn fetch(&self) -> ProviderResult<Vec<Place>> {
        let origin = match self.feed.current_fix() {
            Ok(fix) => fix,
            Err(reason) => return ProviderResult::Failure(reason),
        };

        match self.search(&origin).await {
            Ok(places) => ProviderResult::Success(places),
            Err(reason) => {
                warn!(provider = "places", reason = %reason, "Nearby search failed");
                ProviderResult::Failure(reason)
            }
        }
    }
}

/// User-tagged locations checked before the wrapped places lookup
///
/// When the current fix is inside a tag's geofence the nearest such tag is
/// returned as the single place and the wrapped lookup is skipped.
pub struct TaggedPlacesProvider {
    tags: Vec<TaggedLocation>,
    geofence_radius_m: f64,
    feed: LocationFeed,
    inner: Arc<dyn SignalProvider<Vec<Place>>>,
}

impl TaggedPlacesProvider {
    pub fn new(
        tags: Vec<TaggedLocation>,
        feed: LocationFeed,
        inner: Arc<dyn SignalProvider<Vec<Place>>>,
    ) -> Self {
        Self {
            tags,
            geofence_radius_m: 100.0,
            feed,
            inner,
        }
    }

    /// Set geofence radius in meters (default: 100)
    pub fn with_geofence_radius(mut self, radius_m: f64) -> Self {
        self.geofence_radius_m = radius_m;
        self
    }

    /// Nearest tag whose geofence contains `fix`
    pub fn matching_tag(&self, fix: &LocationFix) -> Option<Place> {
        self.tags
            .iter()
            .map(|tag| (tag, fix.distance_to(tag.lat, tag.lon)))
            .filter(|(_, distance)| *distance <= self.geofence_radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(tag, distance)| Place {
                name: tag.name.clone(),
                category: TAGGED_CATEGORY.to_string(),
                distance_meters: distance,
            })
    }
}

#[async_trait]
impl SignalProvider<Vec<Place>> for TaggedPlacesProvider {
    fn name(&self) -> &'static str {
        "places"
    }

    async fn fetch(&self) -> ProviderResult<Vec<Place>> {
        if let Ok(fix) = self.feed.current_fix() {
            if let Some(place) = self.matching_tag(&fix) {
                debug!(tag = %place.name, distance_m = place.distance_meters, "Inside tagged location");
                return ProviderResult::Success(vec![place]);
            }
        }
        self.inner.fetch().await
    }
}
