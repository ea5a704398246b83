//! Pipeline Orchestrator
//!
//! Drives one recommendation request through its lifecycle:
//!
//! ```text
//! IDLE → AGGREGATING → REQUESTING → DELIVERED
//!             │             │
//!             └─────────────┴──────→ FAILED
//! ```
//!
//! DELIVERED and FAILED are terminal for a request; the next
//! [`PipelineOrchestrator::run_request`] starts again from IDLE. At most one
//! request is AGGREGATING or REQUESTING at a time. Every state change is
//! published on the [`EventBus`].

use crate::aggregator::{gather, AggregationTimeouts};
use crate::client::RecommendationClient;
use crate::error::{PipelineError, PipelineResult};
use crate::providers::{FrameBufferProvider, ProviderSet};
use crate::utils::retry::RetryPolicy;
use chrono::Utc;
use ctun_common::config::{ApiKeys, TomlConfig};
use ctun_common::events::{CtunEvent, EventBus};
use ctun_common::models::{Completeness, Recommendation, RequestState};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub timeouts: AggregationTimeouts,
    pub retry: RetryPolicy,
    pub recommendation_url: String,
    /// Outbound request cap for the recommendation service
    pub rate_limit_per_second: Option<NonZeroU32>,
}

impl PipelineConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let settings = &config.pipeline;
        Self {
            timeouts: AggregationTimeouts {
                signal: Duration::from_millis(settings.signal_timeout_ms),
                image: Duration::from_millis(settings.image_timeout_ms),
            },
            retry: RetryPolicy::from_settings(settings),
            recommendation_url: config.endpoints.recommendation_url.clone(),
            rate_limit_per_second: settings.recommendation_rate_per_second.and_then(NonZeroU32::new),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

/// Recommendation pipeline orchestrator
pub struct PipelineOrchestrator {
    providers: ProviderSet,
    client: RecommendationClient,
    config: PipelineConfig,
    event_bus: EventBus,
    /// Set while a request is AGGREGATING or REQUESTING
    in_flight: AtomicBool,
    /// Never held across an `.await`
    state: Mutex<RequestState>,
}

/// Releases the in-flight flag on every exit path
///
/// If the request future is dropped mid-flight the request is moved to
/// FAILED and a cancellation is published.
struct InFlightGuard<'a> {
    orchestrator: &'a PipelineOrchestrator,
    request_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.orchestrator.state().is_active() {
            warn!(request_id = %self.request_id, "Request dropped while in flight");
            self.orchestrator
                .fail(self.request_id, &PipelineError::Cancelled);
        }
        self.orchestrator.in_flight.store(false, Ordering::Release);
    }
}

impl PipelineOrchestrator {
    pub fn new(
        providers: ProviderSet,
        http_client: Client,
        config: PipelineConfig,
        event_bus: EventBus,
    ) -> Self {
        let mut client = RecommendationClient::new(
            http_client,
            config.recommendation_url.clone(),
            config.retry.clone(),
        );
        if let Some(per_second) = config.rate_limit_per_second {
            client = client.with_rate_limit(per_second);
        }

        Self {
            providers,
            client,
            config,
            event_bus,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(RequestState::Idle),
        }
    }

    /// Current request state
    pub fn state(&self) -> RequestState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CtunEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one recommendation request
    ///
    /// `image` is the frame captured for this request; when `None` the
    /// configured image provider is used. Fails immediately with
    /// `RequestInProgress` if another request is in flight, without touching
    /// that request.
    pub async fn run_request(
        &self,
        image: Option<Vec<u8>>,
        keys: &ApiKeys,
        cancel: &CancellationToken,
    ) -> PipelineResult<Vec<Recommendation>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Recommendation request rejected: another request is in progress");
            return Err(PipelineError::RequestInProgress);
        }

        let request_id = Uuid::new_v4();
        let _guard = InFlightGuard {
            orchestrator: self,
            request_id,
        };

        if self.state().is_terminal() {
            self.transition(request_id, RequestState::Idle);
        }
        self.transition(request_id, RequestState::Aggregating);
        info!(request_id = %request_id, "Recommendation request started");

        let providers = match image {
            Some(bytes) => self
                .providers
                .with_image(Arc::new(FrameBufferProvider::new(Some(bytes)))),
            None => self.providers.clone(),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.execute(request_id, &providers, &keys.recommendation) => result,
        };

        match outcome {
            Ok((completeness, recommendations)) => {
                self.transition(request_id, RequestState::Delivered);
                info!(
                    request_id = %request_id,
                    count = recommendations.len(),
                    completeness = ?completeness,
                    "Recommendations delivered"
                );
                self.event_bus.emit_lossy(CtunEvent::RecommendationsDelivered {
                    request_id,
                    completeness,
                    recommendations: recommendations.clone(),
                    timestamp: Utc::now(),
                });
                Ok(recommendations)
            }
            Err(err) => {
                self.fail(request_id, &err);
                Err(err)
            }
        }
    }

    /// Aggregate then request; cancellation drops this future
    async fn execute(
        &self,
        request_id: Uuid,
        providers: &ProviderSet,
        api_key: &str,
    ) -> PipelineResult<(Completeness, Vec<Recommendation>)> {
        let gathered = gather(providers, &self.config.timeouts).await;

        for outcome in &gathered.report.outcomes {
            self.event_bus.emit_lossy(CtunEvent::ProviderResolved {
                request_id,
                provider: outcome.provider.to_string(),
                outcome: outcome.outcome.to_string(),
                elapsed_ms: outcome.elapsed.as_millis() as u64,
            });
        }

        let snapshot = gathered.into_snapshot()?;
        let completeness = snapshot.completeness();

        self.transition(request_id, RequestState::Requesting);
        let recommendations = self.client.recommend(&snapshot, api_key).await?;
        Ok((completeness, recommendations))
    }

    /// Move to FAILED and publish the error
    fn fail(&self, request_id: Uuid, err: &PipelineError) {
        error!(request_id = %request_id, kind = err.kind(), error = %err, "Recommendation request failed");
        self.transition(request_id, RequestState::Failed);
        self.event_bus.emit_lossy(CtunEvent::RequestFailed {
            request_id,
            kind: err.kind().to_string(),
            message: err.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Apply a state transition and publish it
    fn transition(&self, request_id: Uuid, new_state: RequestState) {
        let old_state = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let old_state = *state;
            if !old_state.can_transition_to(new_state) {
                error!(
                    request_id = %request_id,
                    from = %old_state,
                    to = %new_state,
                    "Invalid request state transition ignored"
                );
                return;
            }
            *state = new_state;
            old_state
        };

        self.event_bus.emit_lossy(CtunEvent::RequestStateChanged {
            request_id,
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }
}
