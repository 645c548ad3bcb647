//! Engine Layer
//!
//! The ingestion-retention core: a sampler writing readings, a trimmer
//! capping the Series, both driven by a scheduler on independent clocks.
//!
//! # Architecture
//!
//! - [`Sampler`]: Fetches one snapshot per tick and persists it, single-flight
//! - [`Trimmer`]: Deletes the oldest readings beyond the [`RetentionPolicy`]
//! - [`Scheduler`]: Owns periodic jobs with a start/stop lifecycle
//! - [`Tracker`]: Wires explicit source and store dependencies together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use isstrack::engine::{Tracker, TrackerOptions};
//! use isstrack::source::{HttpSource, HttpSourceConfig};
//! use isstrack::storage::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(HttpSource::new(HttpSourceConfig::default())?);
//! let store = Arc::new(MemoryStore::new());
//! let mut tracker = Tracker::new(source, store, TrackerOptions::default());
//! tracker.start()?;
//! let recent = tracker.query().get_recent_readings(50).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod sampler;
mod scheduler;
mod tracker;
mod trimmer;

pub use error::EngineError;
pub use sampler::{
    CycleOutcome, DEFAULT_CALL_TIMEOUT, DEFAULT_SAMPLE_INTERVAL, Sampler, SamplerState,
    SamplerStatus,
};
pub use scheduler::{
    DEFAULT_SHUTDOWN_TIMEOUT, JobInfo, MIN_INTERVAL, PeriodicTask, Scheduler, clamp_interval,
};
pub use tracker::{Tracker, TrackerOptions};
pub use trimmer::{DEFAULT_MAX_RECORDS, DEFAULT_TRIM_INTERVAL, RetentionPolicy, TrimReport, Trimmer};
