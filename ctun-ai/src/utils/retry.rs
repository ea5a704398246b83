//! Retry Logic for the Recommendation Service
//!
//! Exponential backoff with jitter for transient service failures (HTTP 429,
//! 5xx, transport errors). Everything else fails on the first attempt.

use crate::error::PipelineResult;
use ctun_common::config::PipelineSettings;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};

/// Upper bound on relative jitter; keeps the delay scale positive
const MAX_JITTER: f64 = 0.95;

/// Backoff policy for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Multiplier applied per retry
    pub factor: f64,
    /// Relative jitter (0.2 = ±20%), capped at 0.95
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            factor: settings.backoff_factor,
            jitter: settings.backoff_jitter,
        }
    }

    /// Delay before retry `retry` (1-based) without jitter
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let factor = if self.factor.is_finite() { self.factor.max(1.0) } else { 1.0 };
        let secs = self.base_delay.as_secs_f64() * factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay before retry `retry` (1-based) with jitter applied
    pub fn delay_for(&self, retry: u32) -> Duration {
        let nominal = self.nominal_delay(retry);
        if self.jitter.is_nan() || self.jitter <= 0.0 {
            return nominal;
        }
        let jitter = self.jitter.min(MAX_JITTER);
        let scale = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::try_from_secs_f64(nominal.as_secs_f64() * scale).unwrap_or(nominal)
    }
}

/// Retry an operation on transient errors with exponential backoff
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If the error is retryable and retries remain: log WARN, backoff, retry
/// 4. Otherwise return the error unchanged
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "recommendation request")
/// * `policy` - Backoff policy
/// * `operation` - Async closure performing one attempt
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let start_time = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }

                let retry = attempt;
                if retry > policy.max_retries {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(err);
                }

                let backoff = policy.delay_for(retry);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}
