//! Places and weather provider tests against a local scripted server

mod helpers;

use ctun_ai::providers::{LocationFeed, NearbyPlacesProvider, OpenWeatherProvider};
use ctun_ai::types::{ProviderResult, SignalProvider};
use ctun_common::models::{LocationFix, WeatherCondition};
use helpers::{MockResponse, MockServer};
use serde_json::json;

fn feed_at(lat: f64, lon: f64) -> LocationFeed {
    let feed = LocationFeed::new();
    feed.publish(LocationFix::new(lat, lon, 6.0));
    feed
}

fn places_provider(server: &MockServer, feed: &LocationFeed) -> NearbyPlacesProvider {
    NearbyPlacesProvider::new(
        reqwest::Client::new(),
        server.url("/v1/places:searchNearby"),
        "places-key",
        feed.clone(),
    )
}

fn weather_provider(server: &MockServer, feed: &LocationFeed) -> OpenWeatherProvider {
    OpenWeatherProvider::new(
        reqwest::Client::new(),
        server.url("/data/2.5/weather"),
        "weather-key",
        feed.clone(),
    )
}

// ============================================================================
// Places
// ============================================================================

#[tokio::test]
async fn test_places_request_shape() {
    let server = MockServer::always(200, json!({})).await;
    let feed = feed_at(48.8566, 2.3522);

    let result = places_provider(&server, &feed).fetch().await;
    assert_eq!(result, ProviderResult::Success(Vec::new()));

    let request = server.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("x-goog-api-key"), Some("places-key"));
    assert!(request
        .header("x-goog-fieldmask")
        .unwrap()
        .contains("places.displayName"));

    let body = request.json();
    assert_eq!(body["maxResultCount"], 10);
    assert_eq!(body["rankPreference"], "DISTANCE");
    assert_eq!(body["locationRestriction"]["circle"]["radius"], 300.0);
    assert_eq!(body["locationRestriction"]["circle"]["center"]["latitude"], 48.8566);
    let types: Vec<&str> = body["includedTypes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert!(types.contains(&"gym"));
    assert!(types.contains(&"beach"));
}

#[tokio::test]
async fn test_places_converted_and_sorted_by_distance() {
    let server = MockServer::always(
        200,
        json!({"places": [
            {
                "displayName": {"text": "Jardin du Luxembourg"},
                "primaryType": "park",
                "location": {"latitude": 48.8590, "longitude": 2.3522}
            },
            {
                "displayName": {"text": "Le Comptoir"},
                "primaryType": "bar",
                "location": {"latitude": 48.8570, "longitude": 2.3522}
            },
            {
                "displayName": {"text": "Sorbonne"},
                "primaryType": "university",
                "location": {"latitude": 48.8580, "longitude": 2.3522}
            }
        ]}),
    )
    .await;
    let feed = feed_at(48.8566, 2.3522);

    let places = places_provider(&server, &feed)
        .fetch()
        .await
        .into_option()
        .unwrap();

    let names: Vec<&str> = places.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Le Comptoir", "Sorbonne", "Jardin du Luxembourg"]);
    assert_eq!(places[0].category, "nightlife");
    assert_eq!(places[1].category, "school");
    assert_eq!(places[2].category, "park");
    assert!((places[0].distance_meters - 44.5).abs() < 1.0);
}

#[tokio::test]
async fn test_places_http_error_is_failure() {
    let server = MockServer::start(vec![MockResponse::new(403, r#"{"error": "denied"}"#)]).await;
    let feed = feed_at(48.8566, 2.3522);

    let result = places_provider(&server, &feed).fetch().await;
    match result {
        ProviderResult::Failure(reason) => assert!(reason.contains("403")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_places_without_fix_skips_request() {
    let server = MockServer::always(200, json!({})).await;

    let result = places_provider(&server, &LocationFeed::new()).fetch().await;
    assert_eq!(result.outcome_label(), "failure");
    assert_eq!(server.hits(), 0);
}

// ============================================================================
// Weather
// ============================================================================

#[tokio::test]
async fn test_weather_request_and_mapping() {
    let server = MockServer::always(
        200,
        json!({
            "weather": [{"id": 741, "main": "Fog", "description": "fog"}],
            "main": {"temp": 6.2, "feels_like": 4.0}
        }),
    )
    .await;
    let feed = feed_at(-41.2865, 174.7762);

    let report = weather_provider(&server, &feed)
        .fetch()
        .await
        .into_option()
        .unwrap();
    assert_eq!(report.condition, WeatherCondition::Foggy);
    assert_eq!(report.temperature_c, 6.2);

    let request = server.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.uri.path(), "/data/2.5/weather");
    assert_eq!(request.query_param("units").as_deref(), Some("metric"));
    assert_eq!(request.query_param("appid").as_deref(), Some("weather-key"));
    assert_eq!(request.query_param("lat").as_deref(), Some("-41.2865"));
    assert_eq!(request.query_param("lon").as_deref(), Some("174.7762"));
}

#[tokio::test]
async fn test_weather_unauthorized_is_failure() {
    let server = MockServer::always(401, json!({"cod": 401, "message": "Invalid API key"})).await;
    let feed = feed_at(0.0, 0.0);

    let result = weather_provider(&server, &feed).fetch().await;
    match result {
        ProviderResult::Failure(reason) => assert!(reason.contains("401")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_weather_missing_fields_is_failure() {
    let server = MockServer::always(200, json!({"weather": []})).await;
    let feed = feed_at(0.0, 0.0);

    let result = weather_provider(&server, &feed).fetch().await;
    assert_eq!(result.outcome_label(), "failure");
}
