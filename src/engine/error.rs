//! Engine error taxonomy.

use thiserror::Error;

use crate::source::SourceError;
use crate::storage::StoreError;

/// Errors raised by the sampler, the trimmer and the query surface.
///
/// Inside the scheduled jobs every variant is recovered locally: it is
/// logged and the schedule continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source fetch failed or timed out.
    #[error(transparent)]
    Unavailable(#[from] SourceError),

    /// Persisting a new reading failed or timed out.
    #[error("write failed: {0}")]
    WriteFailed(#[source] StoreError),

    /// Reading the Series failed or timed out.
    #[error("read failed: {0}")]
    ReadFailed(#[source] StoreError),

    /// A batch deletion failed as a whole or timed out.
    #[error("delete failed: {0}")]
    DeleteFailed(#[source] StoreError),

    /// Scheduler lifecycle error.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}
