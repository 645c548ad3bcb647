//! isstrack - ISS Position Tracking Library
//!
//! This crate provides the core functionality for the isstrack service: it
//! samples the ISS position from an upstream API on a fixed period, persists
//! each sample, caps the stored series to a retention limit, and serves the
//! live and stored positions over HTTP. It can be used as a library or run as
//! the standalone `isstrack` binary.
//!
//! # Architecture
//!
//! - **Source**: One upstream HTTP call per snapshot (`reqwest`)
//! - **Storage**: SQLite persistence via `sqlx`, or an in-memory store
//! - **Engine**: Sampler and retention trimmer on independent clocks
//! - **Query**: Live snapshot, recent readings and manual cleanup
//! - **Server**: JSON API (`axum`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use isstrack::{HttpSource, HttpSourceConfig, StorageBuilder, Tracker, TrackerOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handles = StorageBuilder::new("sqlite:data/isstrack.db?mode=rwc").build().await?;
//! let source = Arc::new(HttpSource::new(HttpSourceConfig::default())?);
//!
//! let mut tracker = Tracker::new(source, handles.store.clone(), TrackerOptions::default());
//! tracker.start()?;
//!
//! let latest = tracker.query().get_latest_reading().await?;
//! tracker.shutdown().await?;
//! handles.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod query;
pub mod server;
pub mod source;
pub mod storage;

pub use config::{AppConfig, ConfigError};
pub use engine::{
    EngineError, RetentionPolicy, Sampler, Tracker, TrackerOptions, TrimReport, Trimmer,
};
pub use query::QueryService;
pub use source::{HttpSource, HttpSourceConfig, Snapshot, SnapshotSource, SourceError};
pub use storage::{
    MemoryStore, NewReading, Reading, ReadingStore, SqliteStore, StorageBuilder, StorageHandles,
    StoreError,
};
