//! Recommendation Service Client
//!
//! Serializes a [`ContextSnapshot`] into a request, POSTs it to the
//! recommendation service and parses the ranked track list.
//!
//! # Wire format
//! - Request: `{image?, location?, places?, weather?}` (absent signals are
//!   omitted keys)
//! - Response: `{"recommendations": [{"title", "artist", "confidence", "rationale"}]}`
//!
//! Transient failures (HTTP 429, 5xx, transport) are retried per the
//! configured [`RetryPolicy`]; every other failure surfaces on the first
//! attempt.

use crate::error::{PipelineError, PipelineResult};
use crate::snapshot::{ContextSnapshot, RecommendationRequest};
use crate::utils::retry::{retry_transient, RetryPolicy};
use ctun_common::models::Recommendation;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    recommendations: Option<Vec<WireRecommendation>>,
}

#[derive(Debug, Deserialize)]
struct WireRecommendation {
    title: String,
    artist: String,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

/// Parse a 2xx response body, preserving service order
///
/// # Errors
/// `MalformedResponse` when the body is not JSON, lacks the
/// `recommendations` array, or carries a confidence outside [0, 1].
pub fn parse_recommendations(body: &str) -> PipelineResult<Vec<Recommendation>> {
    let parsed: RecommendationResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let entries = parsed.recommendations.ok_or_else(|| {
        PipelineError::MalformedResponse("missing `recommendations` array".to_string())
    })?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
                return Err(PipelineError::MalformedResponse(format!(
                    "recommendation {} has confidence {} outside [0, 1]",
                    index, entry.confidence
                )));
            }
            Ok(Recommendation {
                track_title: entry.title,
                artist: entry.artist,
                confidence: entry.confidence as f32,
                rationale: entry.rationale,
            })
        })
        .collect()
}

fn transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_builder() {
        PipelineError::Config(format!("invalid recommendation request: {}", err))
    } else {
        PipelineError::Transport(err.to_string())
    }
}

/// HTTP client for the recommendation service
pub struct RecommendationClient {
    http_client: Client,
    endpoint: String,
    retry: RetryPolicy,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl RecommendationClient {
    pub fn new(http_client: Client, endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            retry,
            rate_limiter: None,
        }
    }

    /// Cap outbound requests (retries included) at `per_second`
    pub fn with_rate_limit(mut self, per_second: NonZeroU32) -> Self {
        self.rate_limiter = Some(RateLimiter::direct(Quota::per_second(per_second)));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Request recommendations for `snapshot`
    ///
    /// Returns the list in service relevance order; an empty list is a
    /// valid answer.
    pub async fn recommend(
        &self,
        snapshot: &ContextSnapshot,
        api_key: &str,
    ) -> PipelineResult<Vec<Recommendation>> {
        let payload = snapshot.to_request();

        debug!(
            completeness = ?snapshot.completeness(),
            sources = snapshot.source_count(),
            endpoint = %self.endpoint,
            "Sending recommendation request"
        );

        let recommendations = retry_transient("recommendation request", &self.retry, || {
            self.send_once(&payload, api_key)
        })
        .await?;

        info!(count = recommendations.len(), "Recommendations received");
        Ok(recommendations)
    }

    /// One POST attempt, no retries
    async fn send_once(
        &self,
        payload: &RecommendationRequest<'_>,
        api_key: &str,
    ) -> PipelineResult<Vec<Recommendation>> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(PipelineError::RecommendationService {
                status: status.as_u16(),
                body,
            });
        }

        parse_recommendations(&body)
    }
}
