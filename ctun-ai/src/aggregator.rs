//! Context Aggregator
//!
//! Fans out to the four signal providers concurrently, races each against its
//! own timeout and merges the outcomes into a [`ContextSnapshot`].
//!
//! # Error isolation
//! A failing or hanging provider only lowers snapshot completeness. Total
//! aggregation time is bounded by the largest timeout, not the sum of
//! provider latencies.

use crate::error::PipelineResult;
use crate::providers::ProviderSet;
use crate::snapshot::ContextSnapshot;
use crate::types::{ImageFrame, ProviderResult, SignalProvider};
use ctun_common::models::{LocationFix, Place, WeatherReport};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-provider timeout
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-provider timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationTimeouts {
    /// Location, places and weather
    pub signal: Duration,
    /// Reading the captured frame
    pub image: Duration,
}

impl AggregationTimeouts {
    /// Same timeout for every provider
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            signal: timeout,
            image: timeout,
        }
    }

    /// Longest single timeout (upper bound on aggregation time)
    pub fn max(&self) -> Duration {
        self.signal.max(self.image)
    }
}

impl Default for AggregationTimeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_SIGNAL_TIMEOUT)
    }
}

/// How one provider resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    pub provider: &'static str,
    /// "success", "failure" or "timed_out"
    pub outcome: &'static str,
    pub detail: Option<String>,
    pub elapsed: Duration,
}

/// Per-provider outcomes for one aggregation, in provider order
/// (image, location, places, weather)
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub outcomes: Vec<ProviderOutcome>,
    pub elapsed: Duration,
}

impl AggregationReport {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == "success")
            .count()
    }

    pub fn outcome_of(&self, provider: &str) -> Option<&ProviderOutcome> {
        self.outcomes.iter().find(|o| o.provider == provider)
    }
}

/// Raw provider results before merging
#[derive(Debug)]
pub struct GatheredSignals {
    pub image: ProviderResult<ImageFrame>,
    pub location: ProviderResult<LocationFix>,
    pub places: ProviderResult<Vec<Place>>,
    pub weather: ProviderResult<WeatherReport>,
    pub report: AggregationReport,
}

impl GatheredSignals {
    /// Merge into a snapshot (`InsufficientContext` when nothing succeeded)
    pub fn into_snapshot(self) -> PipelineResult<ContextSnapshot> {
        ContextSnapshot::from_results(self.image, self.location, self.places, self.weather)
    }
}

/// Fetch from one provider, bounded by `timeout`
///
/// The provider future is dropped when the timeout fires.
pub async fn timed_fetch<T: Send + 'static>(
    provider: &dyn SignalProvider<T>,
    timeout: Duration,
) -> (ProviderResult<T>, ProviderOutcome) {
    let name = provider.name();
    let start = Instant::now();

    let result = match tokio::time::timeout(timeout, provider.fetch()).await {
        Ok(result) => result,
        Err(_) => ProviderResult::TimedOut,
    };
    let elapsed = start.elapsed();

    match &result {
        ProviderResult::Success(_) => {
            debug!(provider = name, elapsed_ms = elapsed.as_millis() as u64, "Provider succeeded");
        }
        ProviderResult::Failure(reason) => {
            warn!(provider = name, reason = %reason, elapsed_ms = elapsed.as_millis() as u64, "Provider failed");
        }
        ProviderResult::TimedOut => {
            warn!(provider = name, timeout_ms = timeout.as_millis() as u64, "Provider timed out");
        }
    }

    let outcome = ProviderOutcome {
        provider: name,
        outcome: result.outcome_label(),
        detail: result.detail(),
        elapsed,
    };
    (result, outcome)
}

/// Query all four providers concurrently
pub async fn gather(providers: &ProviderSet, timeouts: &AggregationTimeouts) -> GatheredSignals {
    let start = Instant::now();

    let (image, location, places, weather) = tokio::join!(
        timed_fetch(providers.image.as_ref(), timeouts.image),
        timed_fetch(providers.location.as_ref(), timeouts.signal),
        timed_fetch(providers.places.as_ref(), timeouts.signal),
        timed_fetch(providers.weather.as_ref(), timeouts.signal),
    );

    let report = AggregationReport {
        outcomes: vec![image.1, location.1, places.1, weather.1],
        elapsed: start.elapsed(),
    };

    info!(
        sources = report.success_count(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Context aggregation complete"
    );

    GatheredSignals {
        image: image.0,
        location: location.0,
        places: places.0,
        weather: weather.0,
        report,
    }
}

/// Aggregate with one timeout for every provider
pub async fn aggregate(
    providers: &ProviderSet,
    per_provider_timeout: Duration,
) -> PipelineResult<ContextSnapshot> {
    aggregate_with(providers, &AggregationTimeouts::uniform(per_provider_timeout)).await
}

/// Aggregate with a separate image timeout
pub async fn aggregate_with(
    providers: &ProviderSet,
    timeouts: &AggregationTimeouts,
) -> PipelineResult<ContextSnapshot> {
    gather(providers, timeouts).await.into_snapshot()
}
