//! Source Layer
//!
//! Fetches snapshots of the tracked measurement from upstream.
//!
//! - [`SnapshotSource`]: Core trait for snapshot producers
//! - [`HttpSource`]: One GET against a JSON endpoint per snapshot
//!
//! # Example
//!
//! ```rust,no_run
//! use isstrack::source::{HttpSource, HttpSourceConfig, SnapshotSource};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpSourceConfig::new("https://api.wheretheiss.at/v1/satellites/25544")
//!     .with_timeout(Duration::from_secs(5));
//! let source = HttpSource::new(config)?;
//! let snapshot = source.fetch_snapshot().await?;
//! println!("{} {}", snapshot.latitude, snapshot.longitude);
//! # Ok(())
//! # }
//! ```

mod http;
mod traits;

pub use http::{DEFAULT_SOURCE_TIMEOUT, DEFAULT_SOURCE_URL, HttpSource, HttpSourceConfig};
pub use traits::{Snapshot, SnapshotSource, SourceError};
