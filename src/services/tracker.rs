use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::job::Carrier;
use crate::models::tracking::TrackingInfo;

/// Resolves a tracking number to a normalized result for one carrier.
#[async_trait]
pub trait Tracker: Send + Sync {
    fn carrier(&self) -> Carrier;

    async fn track(&self, tracking_number: &str) -> Result<TrackingInfo, TrackError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Unsupported carrier: {0}")]
    UnsupportedCarrier(Carrier),

    #[error("Tracking lookup failed: {0}")]
    Lookup(String),

    #[error("HTTP request to carrier failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse carrier response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Carrier-keyed set of trackers.
#[derive(Clone, Default)]
pub struct TrackerRegistry {
    trackers: HashMap<Carrier, Arc<dyn Tracker>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracker under the carrier it reports, replacing any previous one.
    pub fn register(&mut self, tracker: Arc<dyn Tracker>) -> &mut Self {
        self.trackers.insert(tracker.carrier(), tracker);
        self
    }

    pub fn with(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.register(tracker);
        self
    }

    /// Look up the tracker for `carrier`, failing before any network work if none exists.
    pub fn resolve(&self, carrier: Carrier) -> Result<Arc<dyn Tracker>, TrackError> {
        self.trackers
            .get(&carrier)
            .cloned()
            .ok_or(TrackError::UnsupportedCarrier(carrier))
    }

    pub fn carriers(&self) -> impl Iterator<Item = Carrier> + '_ {
        self.trackers.keys().copied()
    }
}
