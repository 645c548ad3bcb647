//! Retention trimmer.
//!
//! Keeps the Series at or below `max_records` by deleting the oldest excess
//! readings in chunks of `DELETE_CHUNK_SIZE`, each under its own deadline. The count and the excess selection are not
//! transactional against concurrent inserts, so a run that overlaps sampler
//! writes trims against the size it read; the remainder is picked up by the
//! next run.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::engine::EngineError;
use crate::engine::sampler::DEFAULT_CALL_TIMEOUT;
use crate::engine::scheduler::PeriodicTask;
use crate::storage::{DELETE_CHUNK_SIZE, ReadingStore, bounded};

/// Default cap on the Series.
pub const DEFAULT_MAX_RECORDS: u64 = 1000;

/// Default trim interval (30 minutes).
pub const DEFAULT_TRIM_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// The rule capping the Series to its most recent readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    /// Readings kept after a trim. Always positive.
    pub max_records: u64,
}

impl RetentionPolicy {
    /// Create a policy; a zero cap is raised to 1.
    pub fn new(max_records: u64) -> Self {
        Self {
            max_records: max_records.max(1),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

/// Outcome of one trim run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TrimReport {
    /// The Series was within the cap.
    NotNeeded { count: u64 },
    /// Excess readings were submitted for deletion.
    Trimmed {
        requested: u64,
        deleted: u64,
        failed_ids: Vec<String>,
    },
    /// Another run was in progress; nothing was done.
    Busy,
}

impl TrimReport {
    /// Number of readings removed by this run.
    pub fn deleted(&self) -> u64 {
        match self {
            Self::Trimmed { deleted, .. } => *deleted,
            _ => 0,
        }
    }

    /// Human-readable summary.
    pub fn message(&self) -> String {
        match self {
            Self::NotNeeded { .. } => "No cleanup needed".to_string(),
            Self::Trimmed {
                requested, deleted, ..
            } if deleted < requested => {
                format!("Deleted {deleted} of {requested} old records")
            }
            Self::Trimmed { deleted, .. } => format!("Deleted {deleted} old records"),
            Self::Busy => "Cleanup already in progress".to_string(),
        }
    }
}

/// Enforces the retention policy against the store.
pub struct Trimmer {
    store: Arc<dyn ReadingStore>,
    policy: RetentionPolicy,
    interval: Duration,
    store_timeout: Duration,
    in_flight: Mutex<()>,
}

impl Trimmer {
    /// Create a trimmer with the default interval and call timeout.
    pub fn new(store: Arc<dyn ReadingStore>, policy: RetentionPolicy) -> Self {
        Self {
            store,
            policy,
            interval: DEFAULT_TRIM_INTERVAL,
            store_timeout: DEFAULT_CALL_TIMEOUT,
            in_flight: Mutex::new(()),
        }
    }

    /// Set the trim interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the bound on each store call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// The policy this trimmer enforces.
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Run one trim.
    ///
    /// A failed or timed-out chunk is not an error: its ids land in
    /// `failed_ids`, other chunks keep their deletions, and the survivors are
    /// selected again next run. The run only fails when no chunk deleted
    /// anything and at least one chunk errored.
    pub async fn run_once(&self) -> Result<TrimReport, EngineError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Retention cleanup already in progress");
            return Ok(TrimReport::Busy);
        };

        let max_records = self.policy.max_records;
        let count = bounded(self.store_timeout, self.store.count())
            .await
            .map_err(EngineError::ReadFailed)?;

        if count <= max_records {
            tracing::debug!(count, max_records, "No cleanup needed");
            return Ok(TrimReport::NotNeeded { count });
        }

        // Everything ranked past the cap, newest-first order.
        let excess = bounded(self.store_timeout, self.store.list_recent(None, max_records))
            .await
            .map_err(EngineError::ReadFailed)?;
        if excess.is_empty() {
            return Ok(TrimReport::NotNeeded { count });
        }

        let ids: Vec<String> = excess.into_iter().map(|r| r.id).collect();
        let requested = ids.len() as u64;
        let mut deleted = 0;
        let mut failed_ids = Vec::new();
        let mut last_error = None;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            match bounded(self.store_timeout, self.store.delete_batch(chunk)).await {
                Ok(outcome) => {
                    deleted += outcome.deleted;
                    failed_ids.extend(outcome.failed_ids);
                }
                Err(e) => {
                    tracing::warn!(error = %e, chunk_len = chunk.len(), "Retention delete chunk failed");
                    failed_ids.extend(chunk.iter().cloned());
                    last_error = Some(e);
                }
            }
        }

        if deleted == 0
            && let Some(e) = last_error
        {
            return Err(EngineError::DeleteFailed(e));
        }

        if failed_ids.is_empty() {
            tracing::info!(count, max_records, deleted, "Retention cleanup finished");
        } else {
            tracing::warn!(
                count,
                max_records,
                requested,
                deleted,
                failed = failed_ids.len(),
                "Retention cleanup partially failed"
            );
        }

        Ok(TrimReport::Trimmed {
            requested,
            deleted,
            failed_ids,
        })
    }
}

impl std::fmt::Debug for Trimmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trimmer")
            .field("policy", &self.policy)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl PeriodicTask for Trimmer {
    fn name(&self) -> &str {
        "trimmer"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn on_tick(&self) {
        if let Err(e) = self.run_once().await {
            tracing::error!(error = %e, "Retention cleanup failed");
        }
    }
}
