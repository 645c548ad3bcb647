//! In-process reading store.
//!
//! Keeps the Series in memory behind a lock. Selected with the `memory`
//! database URL and used wherever a store without I/O is wanted.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::storage::StoreError;
use crate::storage::traits::ReadingStore;
use crate::storage::types::{DeleteOutcome, NewReading, Reading};

#[derive(Debug, Default)]
struct Inner {
    /// Oldest first; appends keep it sorted by `stored_at`.
    readings: Vec<Reading>,
    last_stored_at: Option<DateTime<Utc>>,
}

/// [`ReadingStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let mut inner = self.inner.write().await;

        let now = Utc::now();
        let stored_at = match inner.last_stored_at {
            Some(last) if last > now => last,
            _ => now,
        };
        let id = uuid::Uuid::new_v4().simple().to_string();
        let stored = Reading::from_new(id, reading, stored_at);

        inner.last_stored_at = Some(stored_at);
        inner.readings.push(stored.clone());
        Ok(stored)
    }

    async fn list_recent(
        &self,
        limit: Option<u32>,
        offset: u64,
    ) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = limit.map_or(usize::MAX, |l| l as usize);

        Ok(inner
            .readings
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.readings.len() as u64)
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = inner.readings.len();
        inner.readings.retain(|r| !doomed.contains(r.id.as_str()));

        Ok(DeleteOutcome {
            deleted: (before - inner.readings.len()) as u64,
            failed_ids: Vec::new(),
        })
    }
}
