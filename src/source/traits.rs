//! Core source traits and types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::NewReading;

/// Errors that can occur while fetching a snapshot.
///
/// Transport failures, non-success statuses, malformed payloads and timeouts
/// all collapse into one outcome; callers never need finer classification.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The upstream measurement could not be obtained.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// One point-in-time measurement fetched from upstream, prior to persistence.
///
/// Fields beyond the five the Series stores are kept in `extra`, so a snapshot
/// serializes back to the upstream JSON unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub velocity: f64,
    /// Epoch seconds reported by the source.
    pub timestamp: f64,
    /// Any other upstream fields (name, visibility, footprint, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Snapshot {
    /// Create a snapshot with no extra upstream fields.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, velocity: f64, timestamp: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            velocity,
            timestamp,
            extra: serde_json::Map::new(),
        }
    }

    /// The fields persisted as a reading.
    pub fn to_new_reading(&self) -> NewReading {
        NewReading {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            velocity: self.velocity,
            timestamp: self.timestamp,
        }
    }
}

/// Producer of snapshots of the tracked measurement.
///
/// One call is one upstream request. Implementations do not retry; the
/// sampler's next tick is the retry policy.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch one snapshot.
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError>;
}
