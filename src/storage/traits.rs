//! The store adapter contract.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::storage::StoreError;
use crate::storage::types::{DeleteOutcome, NewReading, Reading};

/// Thin contract over the document store holding the Series.
///
/// This is the only place the Series is mutated. Implementations must be
/// safe for concurrent use by the sampler, the trimmer and request handlers,
/// and must not buffer, cache or reorder records. Each method is atomic at the
/// single-record or single-batch level.
#[async_trait]
pub trait ReadingStore: Send + Sync + 'static {
    /// Append one reading. The store assigns `id` and `stored_at`.
    ///
    /// Returns the stored reading.
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError>;

    /// Readings ordered by `stored_at` descending, newest first.
    ///
    /// `limit: None` returns everything after `offset`.
    async fn list_recent(&self, limit: Option<u32>, offset: u64)
    -> Result<Vec<Reading>, StoreError>;

    /// Number of live readings.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Delete readings by identifier.
    ///
    /// Identifiers that no longer exist are neither counted nor reported as failed.
    async fn delete_batch(&self, ids: &[String]) -> Result<DeleteOutcome, StoreError>;
}

/// Run a store call under a deadline.
///
/// An elapsed deadline is reported as [`StoreError::Timeout`]; the call is dropped.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}
