//! Query Surface
//!
//! Read-side operations over the live source and the stored Series, plus the
//! manual retention trigger. Handlers in [`crate::server`] are thin wrappers
//! around this service.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::{DEFAULT_CALL_TIMEOUT, EngineError, TrimReport, Trimmer};
use crate::source::{Snapshot, SnapshotSource, SourceError};
use crate::storage::{Reading, ReadingStore, bounded};

/// Number of readings returned when the caller gives no limit.
pub const DEFAULT_RECENT_LIMIT: u32 = 50;

/// Upper bound on a single recent-readings request.
pub const MAX_RECENT_LIMIT: u32 = 1000;

/// Cheap-to-clone handle on the read side of the engine.
#[derive(Clone)]
pub struct QueryService {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn ReadingStore>,
    trimmer: Arc<Trimmer>,
    source_timeout: Duration,
    store_timeout: Duration,
}

impl QueryService {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn ReadingStore>,
        trimmer: Arc<Trimmer>,
    ) -> Self {
        Self {
            source,
            store,
            trimmer,
            source_timeout: DEFAULT_CALL_TIMEOUT,
            store_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the bound on each source call.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Set the bound on each store call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Retention cap enforced by the trimmer.
    pub fn max_records(&self) -> u64 {
        self.trimmer.policy().max_records
    }

    /// Fetch the current upstream snapshot, bypassing storage.
    pub async fn get_live_snapshot(&self) -> Result<Snapshot, EngineError> {
        let snapshot = tokio::time::timeout(self.source_timeout, self.source.fetch_snapshot())
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Unavailable(format!(
                    "no snapshot within {}ms",
                    self.source_timeout.as_millis()
                )))
            })?;
        Ok(snapshot)
    }

    /// The `limit` most recent readings, newest first.
    ///
    /// A zero `limit` yields an empty list; larger values are capped at
    /// `MAX_RECENT_LIMIT`.
    pub async fn get_recent_readings(&self, limit: u32) -> Result<Vec<Reading>, EngineError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_RECENT_LIMIT);
        bounded(self.store_timeout, self.store.list_recent(Some(limit), 0))
            .await
            .map_err(EngineError::ReadFailed)
    }

    /// The most recently stored reading, if any.
    pub async fn get_latest_reading(&self) -> Result<Option<Reading>, EngineError> {
        let mut readings = self.get_recent_readings(1).await?;
        Ok(readings.pop())
    }

    /// Run one retention cycle now and report its outcome.
    pub async fn trigger_cleanup_now(&self) -> Result<TrimReport, EngineError> {
        tracing::info!(max_records = self.max_records(), "Manual cleanup requested");
        self.trimmer.run_once().await
    }

    /// Check the store answers; returns the Series size.
    pub async fn check_ready(&self) -> Result<u64, EngineError> {
        bounded(self.store_timeout, self.store.count())
            .await
            .map_err(EngineError::ReadFailed)
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("source", &self.source.name())
            .field("max_records", &self.max_records())
            .finish_non_exhaustive()
    }
}
