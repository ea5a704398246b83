//! Error types for ctun-ai
//!
//! Per-provider failures are not errors: they are absorbed into
//! [`ProviderResult::Failure`](crate::types::ProviderResult) and only lower
//! snapshot completeness. Everything here is fatal to one request.

use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No signal source succeeded; the snapshot would be empty
    #[error("Insufficient context: no signal source succeeded ({0})")]
    InsufficientContext(String),

    /// Recommendation service answered with a non-2xx status
    #[error("Recommendation service returned HTTP {status}: {body}")]
    RecommendationService { status: u16, body: String },

    /// Connection failure, reset or timeout talking to the service
    #[error("Transport error: {0}")]
    Transport(String),

    /// 2xx response that does not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Another request is already aggregating or requesting
    #[error("A recommendation request is already in progress")]
    RequestInProgress,

    /// Caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid configuration or request construction
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Transient failures worth retrying: HTTP 429, 5xx and transport errors
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::RecommendationService { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            PipelineError::Transport(_) => true,
            _ => false,
        }
    }

    /// Stable kind label for events
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InsufficientContext(_) => "insufficient_context",
            PipelineError::RecommendationService { .. } => "service_error",
            PipelineError::Transport(_) => "transport_error",
            PipelineError::MalformedResponse(_) => "malformed_response",
            PipelineError::RequestInProgress => "request_in_progress",
            PipelineError::Cancelled => "cancelled",
            PipelineError::Config(_) => "config_error",
        }
    }
}

impl From<ctun_common::Error> for PipelineError {
    fn from(err: ctun_common::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
