//! Test signal providers and fixtures

use async_trait::async_trait;
use ctun_ai::providers::StaticProvider;
use ctun_ai::types::{ImageFrame, ProviderResult, SignalProvider};
use ctun_ai::ProviderSet;
use ctun_common::models::{LocationFix, Place, WeatherCondition, WeatherReport};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn test_fix() -> LocationFix {
    LocationFix::new(-33.8688, 151.2093, 8.0)
}

pub fn test_weather() -> WeatherReport {
    WeatherReport {
        condition: WeatherCondition::Rainy,
        temperature_c: 17.5,
    }
}

pub fn test_places() -> Vec<Place> {
    vec![
        Place {
            name: "Campos Coffee".to_string(),
            category: "cafe".to_string(),
            distance_meters: 40.0,
        },
        Place {
            name: "Hyde Park".to_string(),
            category: "park".to_string(),
            distance_meters: 210.0,
        },
    ]
}

/// Provider that resolves only after its gate is opened
pub struct GatedProvider<T> {
    name: &'static str,
    gate: Arc<Notify>,
    value: T,
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> SignalProvider<T> for GatedProvider<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> ProviderResult<T> {
        self.gate.notified().await;
        ProviderResult::Success(self.value.clone())
    }
}

/// Gated provider plus the handle that opens it
pub fn gated<T>(name: &'static str, value: T) -> (Arc<GatedProvider<T>>, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedProvider {
        name,
        gate: Arc::clone(&gate),
        value,
    });
    (provider, gate)
}

/// Provider that never resolves
pub struct HangingProvider(pub &'static str);

#[async_trait]
impl<T: Send + 'static> SignalProvider<T> for HangingProvider {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn fetch(&self) -> ProviderResult<T> {
        std::future::pending().await
    }
}

pub fn hanging(name: &'static str) -> Arc<HangingProvider> {
    Arc::new(HangingProvider(name))
}

/// Fixed providers; `None` marks a source as unavailable
pub fn static_set(
    image: Option<ImageFrame>,
    location: Option<LocationFix>,
    places: Option<Vec<Place>>,
    weather: Option<WeatherReport>,
) -> ProviderSet {
    fn provider<T: Clone + Send + Sync + 'static>(
        name: &'static str,
        value: Option<T>,
    ) -> Arc<StaticProvider<T>> {
        Arc::new(match value {
            Some(value) => StaticProvider::success(name, value),
            None => StaticProvider::unavailable(name, format!("{} unavailable", name)),
        })
    }

    ProviderSet::new(
        provider("image", image),
        provider("location", location),
        provider("places", places),
        provider("weather", weather),
    )
}
