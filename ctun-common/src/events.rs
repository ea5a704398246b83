//! Event types for the ContextTunes event system
//!
//! The UI layer subscribes to the [`EventBus`] to receive a push notification
//! for every request state change, ending in either
//! [`CtunEvent::RecommendationsDelivered`] or [`CtunEvent::RequestFailed`].

use crate::models::{Completeness, Recommendation, RequestState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// ContextTunes event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CtunEvent {
    /// Request moved between lifecycle states
    RequestStateChanged {
        request_id: Uuid,
        old_state: RequestState,
        new_state: RequestState,
        timestamp: DateTime<Utc>,
    },

    /// One signal provider resolved during aggregation
    ProviderResolved {
        request_id: Uuid,
        /// Provider name ("image", "location", "places", "weather")
        provider: String,
        /// Outcome label ("success", "failure", "timed_out")
        outcome: String,
        elapsed_ms: u64,
    },

    /// Terminal success: recommendations in service relevance order
    RecommendationsDelivered {
        request_id: Uuid,
        completeness: Completeness,
        recommendations: Vec<Recommendation>,
        timestamp: DateTime<Utc>,
    },

    /// Terminal failure with the typed error rendered for display
    RequestFailed {
        request_id: Uuid,
        /// Error kind ("insufficient_context", "service_error", ...)
        kind: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl CtunEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            CtunEvent::RequestStateChanged { request_id, .. }
            | CtunEvent::ProviderResolved { request_id, .. }
            | CtunEvent::RecommendationsDelivered { request_id, .. }
            | CtunEvent::RequestFailed { request_id, .. } => *request_id,
        }
    }
}

/// Broadcast event bus
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CtunEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CtunEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CtunEvent,
    ) -> Result<usize, broadcast::error::SendError<CtunEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CtunEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
