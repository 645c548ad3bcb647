//! Scheduled producer of readings.
//!
//! Each cycle moves `Idle -> Fetching -> Persisting -> Idle`. At most one cycle
//! is in flight; a cycle requested while another runs is dropped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::{Mutex, RwLock};

use crate::engine::EngineError;
use crate::engine::scheduler::PeriodicTask;
use crate::source::{SnapshotSource, SourceError};
use crate::storage::{Reading, ReadingStore, bounded};

/// Default sampling interval (60 seconds).
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on each source or store call (10 seconds).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampler state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SamplerState {
    /// Waiting for the next tick.
    Idle,
    /// Waiting on the source.
    Fetching,
    /// Waiting on the store.
    Persisting,
}

impl SamplerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Fetching,
            2 => Self::Persisting,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Fetching => 1,
            Self::Persisting => 2,
        }
    }
}

/// Result of one requested cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A reading was created.
    Stored(Reading),
    /// Another cycle was in flight; nothing was done.
    Dropped,
    /// The cycle failed; the Series gained nothing.
    Failed(EngineError),
}

impl CycleOutcome {
    /// The stored reading, if the cycle created one.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Stored(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Point-in-time view of the sampler, reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SamplerStatus {
    pub state: SamplerState,
    pub interval_secs: u64,
    pub cycles_ok: u64,
    pub cycles_failed: u64,
    pub ticks_dropped: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_reading_id: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    state: AtomicU8,
    cycles_ok: AtomicU64,
    cycles_failed: AtomicU64,
    ticks_dropped: AtomicU64,
}

#[derive(Debug, Default)]
struct LastCycle {
    success_at: Option<DateTime<Utc>>,
    reading_id: Option<String>,
    error: Option<String>,
}

/// Pulls one snapshot per cycle and persists it.
pub struct Sampler {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn ReadingStore>,
    interval: Duration,
    source_timeout: Duration,
    store_timeout: Duration,
    in_flight: Mutex<()>,
    counters: Counters,
    last: RwLock<LastCycle>,
}

impl Sampler {
    /// Create a sampler with default interval and call timeouts.
    pub fn new(source: Arc<dyn SnapshotSource>, store: Arc<dyn ReadingStore>) -> Self {
        Self {
            source,
            store,
            interval: DEFAULT_SAMPLE_INTERVAL,
            source_timeout: DEFAULT_CALL_TIMEOUT,
            store_timeout: DEFAULT_CALL_TIMEOUT,
            in_flight: Mutex::new(()),
            counters: Counters::default(),
            last: RwLock::new(LastCycle::default()),
        }
    }

    /// Set the sampling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
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

    /// Current state machine position.
    pub fn state(&self) -> SamplerState {
        SamplerState::from_u8(self.counters.state.load(Ordering::Acquire))
    }

    /// Snapshot of counters and the last cycle.
    pub async fn status(&self) -> SamplerStatus {
        let last = self.last.read().await;
        SamplerStatus {
            state: self.state(),
            interval_secs: self.interval.as_secs(),
            cycles_ok: self.counters.cycles_ok.load(Ordering::Relaxed),
            cycles_failed: self.counters.cycles_failed.load(Ordering::Relaxed),
            ticks_dropped: self.counters.ticks_dropped.load(Ordering::Relaxed),
            last_success_at: last.success_at,
            last_reading_id: last.reading_id.clone(),
            last_error: last.error.clone(),
        }
    }

    /// Run one fetch-and-store cycle.
    ///
    /// Failures are recovered here: they are logged, counted and returned as
    /// [`CycleOutcome::Failed`]. A failed cycle's snapshot is discarded.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            self.counters.ticks_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Previous sample cycle still in flight, dropping tick");
            return CycleOutcome::Dropped;
        };

        let result = self.fetch_and_store().await;
        self.set_state(SamplerState::Idle);

        match result {
            Ok(reading) => {
                self.counters.cycles_ok.fetch_add(1, Ordering::Relaxed);
                let mut last = self.last.write().await;
                last.success_at = Some(reading.stored_at);
                last.reading_id = Some(reading.id.clone());
                last.error = None;

                tracing::info!(
                    id = %reading.id,
                    latitude = reading.latitude,
                    longitude = reading.longitude,
                    altitude = reading.altitude,
                    velocity = reading.velocity,
                    timestamp = reading.timestamp,
                    "Reading stored"
                );
                CycleOutcome::Stored(reading)
            }
            Err(e) => {
                self.counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
                self.last.write().await.error = Some(e.to_string());

                tracing::warn!(source = %self.source.name(), error = %e, "Sample cycle failed");
                CycleOutcome::Failed(e)
            }
        }
    }

    async fn fetch_and_store(&self) -> Result<Reading, EngineError> {
        self.set_state(SamplerState::Fetching);
        let snapshot = tokio::time::timeout(self.source_timeout, self.source.fetch_snapshot())
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Unavailable(format!(
                    "no snapshot within {}ms",
                    self.source_timeout.as_millis()
                )))
            })?;

        self.set_state(SamplerState::Persisting);
        bounded(self.store_timeout, self.store.insert(snapshot.to_new_reading()))
            .await
            .map_err(EngineError::WriteFailed)
    }

    fn set_state(&self, state: SamplerState) {
        self.counters.state.store(state.as_u8(), Ordering::Release);
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("source", &self.source.name())
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl PeriodicTask for Sampler {
    fn name(&self) -> &str {
        "sampler"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn on_tick(&self) {
        self.run_cycle().await;
    }
}
