//! Location feed and last-known-location provider
//!
//! The platform location service pushes fixes into a [`LocationFeed`]. Every
//! location-keyed provider reads the same feed at fetch time; a request made
//! before the first fix reports `no location fix available`.

use crate::types::{ProviderResult, SignalProvider};
use async_trait::async_trait;
use ctun_common::models::LocationFix;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

const NO_FIX: &str = "no location fix available";

/// Latest device location, shared between producers and providers
#[derive(Clone)]
pub struct LocationFeed {
    tx: Arc<watch::Sender<Option<LocationFix>>>,
}

impl LocationFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new fix, replacing the previous one
    pub fn publish(&self, fix: LocationFix) {
        debug!(lat = fix.lat, lon = fix.lon, accuracy_m = fix.accuracy_m, "Location fix published");
        self.tx.send_replace(Some(fix));
    }

    /// Forget the current fix (e.g. permission revoked)
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn latest(&self) -> Option<LocationFix> {
        *self.tx.borrow()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Option<LocationFix>> {
        self.tx.subscribe()
    }

    /// Latest valid fix, or the reason none is usable
    pub fn current_fix(&self) -> Result<LocationFix, String> {
        match self.latest() {
            Some(fix) if fix.is_valid() => Ok(fix),
            Some(fix) => Err(format!(
                "invalid fix (lat={}, lon={}, accuracy={})",
                fix.lat, fix.lon, fix.accuracy_m
            )),
            None => Err(NO_FIX.to_string()),
        }
    }

    /// Provider reading this feed
    pub fn provider(&self) -> LastKnownLocationProvider {
        LastKnownLocationProvider { feed: self.clone() }
    }
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Location provider returning the most recent fix
pub struct LastKnownLocationProvider {
    feed: LocationFeed,
}

#[async_trait]
impl SignalProvider<LocationFix> for LastKnownLocationProvider {
    fn name(&self) -> &'static str {
        "location"
    }

    async fn fetch(&self) -> ProviderResult<LocationFix> {
        match self.feed.current_fix() {
            Ok(fix) => ProviderResult::Success(fix),
            Err(reason) => ProviderResult::Failure(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_latest_fix_returned_immediately() {
        let feed = LocationFeed::new();
        feed.publish(LocationFix::new(51.5072, -0.1276, 8.0));
        feed.publish(LocationFix::new(51.5080, -0.1280, 5.0));

        let result = feed.provider().fetch().await;
        assert_eq!(result, ProviderResult::Success(LocationFix::new(51.5080, -0.1280, 5.0)));
    }

    #[tokio::test]
    async fn test_no_fix_is_failure() {
        let feed = LocationFeed::new();
        assert_eq!(
            feed.provider().fetch().await,
            ProviderResult::Failure("no location fix available".to_string())
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_new_fix() {
        let feed = LocationFeed::new();
        let mut rx = feed.subscribe();

        let publisher = feed.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.publish(LocationFix::new(35.6762, 139.6503, 12.0));
        });

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("publish should notify subscribers")
            .unwrap();
        assert!(rx.borrow().is_some());
        assert!(feed.provider().fetch().await.is_success());
    }

    #[tokio::test]
    async fn test_invalid_fix_is_failure() {
        let feed = LocationFeed::new();
        feed.publish(LocationFix::new(123.0, 0.0, 5.0));
        let result = feed.provider().fetch().await;
        assert_eq!(result.outcome_label(), "failure");
    }

    #[test]
    fn test_clear_forgets_fix() {
        let feed = LocationFeed::default();
        feed.publish(LocationFix::new(0.0, 0.0, 1.0));
        assert!(feed.latest().is_some());
        feed.clear();
        assert!(feed.latest().is_none());
    }
}
