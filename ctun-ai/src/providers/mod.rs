//! Signal Providers
//!
//! Four independent sources, each implementing
//! [`SignalProvider`](crate::types::SignalProvider):
//! 1. **image** - captured camera frame (frame buffer or file on disk)
//! 2. **location** - latest device fix from the [`LocationFeed`]
//! 3. **places** - nearby places (Google Places, with tagged-location geofence)
//! 4. **weather** - current weather (OpenWeatherMap)
//!
//! Location-keyed lookups read the shared [`LocationFeed`] rather than the
//! aggregator's location result, so all four run without ordering
//! dependencies.

pub mod image;
pub mod location;
pub mod places;
pub mod weather;

pub use image::{FrameBufferProvider, ImageFileProvider};
pub use location::{LastKnownLocationProvider, LocationFeed};
pub use places::{NearbyPlacesProvider, TaggedPlacesProvider};
pub use weather::OpenWeatherProvider;

use crate::types::{ImageFrame, ProviderResult, SignalProvider};
use async_trait::async_trait;
use ctun_common::models::{LocationFix, Place, WeatherReport};
use std::sync::Arc;

/// The four providers queried for every request
#[derive(Clone)]
pub struct ProviderSet {
    pub image: Arc<dyn SignalProvider<ImageFrame>>,
    pub location: Arc<dyn SignalProvider<LocationFix>>,
    pub places: Arc<dyn SignalProvider<Vec<Place>>>,
    pub weather: Arc<dyn SignalProvider<WeatherReport>>,
}

impl ProviderSet {
    pub fn new(
        image: Arc<dyn SignalProvider<ImageFrame>>,
        location: Arc<dyn SignalProvider<LocationFix>>,
        places: Arc<dyn SignalProvider<Vec<Place>>>,
        weather: Arc<dyn SignalProvider<WeatherReport>>,
    ) -> Self {
        Self {
            image,
            location,
            places,
            weather,
        }
    }

    /// Same providers with the image source replaced
    pub fn with_image(&self, image: Arc<dyn SignalProvider<ImageFrame>>) -> Self {
        Self {
            image,
            ..self.clone()
        }
    }
}

/// Provider returning a fixed outcome
///
/// Stands in for sources that are disabled by configuration (for example a
/// lookup without an API key), so they still report a reason.
pub struct StaticProvider<T> {
    name: &'static str,
    result: ProviderResult<T>,
}

impl<T> StaticProvider<T> {
    pub fn new(name: &'static str, result: ProviderResult<T>) -> Self {
        Self { name, result }
    }

    pub fn success(name: &'static str, value: T) -> Self {
        Self::new(name, ProviderResult::Success(value))
    }

    pub fn unavailable(name: &'static str, reason: impl Into<String>) -> Self {
        Self::new(name, ProviderResult::failure(reason))
    }
}

#[async_trait]
impl<T> SignalProvider<T> for StaticProvider<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> ProviderResult<T> {
        self.result.clone()
    }
}
