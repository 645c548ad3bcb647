//! Coordinating process object.
//!
//! Wires an explicit source and store into the sampler, the trimmer and the
//! query surface, and owns the scheduler that drives the two periodic jobs.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::EngineError;
use crate::engine::sampler::{DEFAULT_CALL_TIMEOUT, DEFAULT_SAMPLE_INTERVAL, Sampler};
use crate::engine::scheduler::Scheduler;
use crate::engine::trimmer::{DEFAULT_TRIM_INTERVAL, RetentionPolicy, Trimmer};
use crate::query::QueryService;
use crate::source::SnapshotSource;
use crate::storage::ReadingStore;

/// Tunables for a [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Sampler period (default: 60s).
    pub sample_interval: Duration,
    /// Trimmer period (default: 30m).
    pub trim_interval: Duration,
    /// Retention policy (default: 1000 records).
    pub retention: RetentionPolicy,
    /// Bound on each source call (default: 10s).
    pub source_timeout: Duration,
    /// Bound on each store call (default: 10s).
    pub store_timeout: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            trim_interval: DEFAULT_TRIM_INTERVAL,
            retention: RetentionPolicy::default(),
            source_timeout: DEFAULT_CALL_TIMEOUT,
            store_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// The running ingestion-retention-query engine.
pub struct Tracker {
    sampler: Arc<Sampler>,
    trimmer: Arc<Trimmer>,
    query: QueryService,
    scheduler: Scheduler,
}

impl Tracker {
    /// Build the engine from its collaborators. Nothing runs until [`start`](Self::start).
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn ReadingStore>,
        options: TrackerOptions,
    ) -> Self {
        let sampler = Arc::new(
            Sampler::new(Arc::clone(&source), Arc::clone(&store))
                .with_interval(options.sample_interval)
                .with_source_timeout(options.source_timeout)
                .with_store_timeout(options.store_timeout),
        );
        let trimmer = Arc::new(
            Trimmer::new(Arc::clone(&store), options.retention)
                .with_interval(options.trim_interval)
                .with_store_timeout(options.store_timeout),
        );
        let query = QueryService::new(source, store, Arc::clone(&trimmer))
            .with_source_timeout(options.source_timeout)
            .with_store_timeout(options.store_timeout);

        Self {
            sampler,
            trimmer,
            query,
            scheduler: Scheduler::new(),
        }
    }

    /// The sampler.
    pub fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }

    /// The trimmer.
    pub fn trimmer(&self) -> &Arc<Trimmer> {
        &self.trimmer
    }

    /// A handle to the query surface.
    pub fn query(&self) -> QueryService {
        self.query.clone()
    }

    /// Register the sampler and trimmer and start their clocks.
    ///
    /// # Errors
    /// Returns `EngineError::Scheduler` if the tracker is already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.scheduler.is_started() {
            return Err(EngineError::Scheduler("tracker already started".to_string()));
        }
        self.scheduler.add(Arc::clone(&self.sampler));
        self.scheduler.add(Arc::clone(&self.trimmer));
        self.scheduler.start()
    }

    /// Stop both clocks, waiting for in-flight cycles.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        self.scheduler.shutdown().await
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("sampler", &self.sampler)
            .field("trimmer", &self.trimmer)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
