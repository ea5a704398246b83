//! Core Types and Trait Definitions for the Recommendation Pipeline
//!
//! Defines the uniform signal-provider seam:
//! - [`ProviderResult`] tagged outcome shared by all four providers
//! - [`SignalProvider`] async trait implemented by image, location,
//!   places and weather sources
//!
//! Heterogeneous provider outputs (`ImageFrame`, `LocationFix`,
//! `Vec<Place>`, `WeatherReport`) flow through the same generic fan-out and
//! merge routine in the aggregator.

use std::sync::Arc;

/// Outcome of one signal provider call
///
/// Providers never return `Err`: every failure mode (permission denied,
/// sensor unavailable, network error, malformed payload) is a `Failure`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult<T> {
    /// Provider produced a value
    Success(T),
    /// Provider failed; reason is for logs and diagnostics only
    Failure(String),
    /// Provider did not answer within its timeout
    TimedOut,
}

impl<T> ProviderResult<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        ProviderResult::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success(_))
    }

    /// Short label used in logs and events
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ProviderResult::Success(_) => "success",
            ProviderResult::Failure(_) => "failure",
            ProviderResult::TimedOut => "timed_out",
        }
    }

    /// Failure reason or timeout note, `None` on success
    pub fn detail(&self) -> Option<String> {
        match self {
            ProviderResult::Success(_) => None,
            ProviderResult::Failure(reason) => Some(reason.clone()),
            ProviderResult::TimedOut => Some("timed out".to_string()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResult<U> {
        match self {
            ProviderResult::Success(value) => ProviderResult::Success(f(value)),
            ProviderResult::Failure(reason) => ProviderResult::Failure(reason),
            ProviderResult::TimedOut => ProviderResult::TimedOut,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ProviderResult::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Signal provider trait
///
/// One implementation per context dimension. `fetch` is polled once per
/// recommendation request; the aggregator races it against a timeout and
/// drops the future when the timeout fires, so implementations must not hold
/// locks across `.await` points.
#[async_trait::async_trait]
pub trait SignalProvider<T: Send + 'static>: Send + Sync {
    /// Provider name for logs and events
    fn name(&self) -> &'static str;

    /// Fetch the current value of this signal
    async fn fetch(&self) -> ProviderResult<T>;
}

/// Captured camera frame
///
/// Cheap to clone: the encoded bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    bytes: Arc<[u8]>,
}

impl ImageFrame {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
