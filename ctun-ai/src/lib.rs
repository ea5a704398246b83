//! ctun-ai library interface
//!
//! Context aggregation and recommendation pipeline:
//! - `providers`: image, location, places and weather signal sources
//! - `aggregator`: concurrent fan-out with per-provider timeouts
//! - `client`: recommendation service client with transient-failure retry
//! - `orchestrator`: request lifecycle, single-flight guard and events

pub mod aggregator;
pub mod client;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod snapshot;
pub mod types;
pub mod utils;

pub use crate::aggregator::{aggregate, aggregate_with, AggregationReport, AggregationTimeouts};
pub use crate::client::RecommendationClient;
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use crate::providers::ProviderSet;
pub use crate::snapshot::ContextSnapshot;
pub use crate::types::{ImageFrame, ProviderResult, SignalProvider};
pub use crate::utils::retry::RetryPolicy;
