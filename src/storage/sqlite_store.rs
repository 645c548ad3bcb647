//! SQLite-backed reading store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::storage::StoreError;
use crate::storage::db::SqlitePool;
use crate::storage::traits::ReadingStore;
use crate::storage::types::{DeleteOutcome, NewReading, Reading};

/// Maximum identifiers deleted per transaction.
pub const DELETE_CHUNK_SIZE: usize = 500;

/// Insert with store-assigned id and `stored_at`.
///
/// `stored_at` is the current time in Unix milliseconds, but never less than
/// the newest existing value, so insertion order and `stored_at` order agree.
const INSERT_SQL: &str = r#"
INSERT INTO readings (id, latitude, longitude, altitude, velocity, timestamp, stored_at)
VALUES (
    lower(hex(randomblob(16))), ?, ?, ?, ?, ?,
    MAX(
        CAST((julianday('now') - 2440587.5) * 86400000.0 AS INTEGER),
        COALESCE((SELECT MAX(stored_at) FROM readings), 0)
    )
)
RETURNING id, stored_at
"#;

const LIST_RECENT_SQL: &str = r#"
SELECT id, latitude, longitude, altitude, velocity, timestamp, stored_at
FROM readings
ORDER BY stored_at DESC, seq DESC
LIMIT ? OFFSET ?
"#;

type ReadingRow = (String, f64, f64, f64, f64, f64, i64);

/// [`ReadingStore`] over a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an initialized pool.
    ///
    /// Note: Schema is expected to be initialized before this is called.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn delete_chunk(&self, ids: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.inner().begin().await?;

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM readings WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::InvalidData(format!("stored_at out of range: {ms}")))
}

fn row_to_reading(row: ReadingRow) -> Result<Reading, StoreError> {
    let (id, latitude, longitude, altitude, velocity, timestamp, stored_at) = row;
    Ok(Reading {
        id,
        latitude,
        longitude,
        altitude,
        velocity,
        timestamp,
        stored_at: millis_to_datetime(stored_at)?,
    })
}

#[async_trait]
impl ReadingStore for SqliteStore {
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError> {
        let (id, stored_at): (String, i64) = sqlx::query_as(INSERT_SQL)
            .bind(reading.latitude)
            .bind(reading.longitude)
            .bind(reading.altitude)
            .bind(reading.velocity)
            .bind(reading.timestamp)
            .fetch_one(self.pool.inner())
            .await?;

        Ok(Reading::from_new(
            id,
            reading,
            millis_to_datetime(stored_at)?,
        ))
    }

    async fn list_recent(
        &self,
        limit: Option<u32>,
        offset: u64,
    ) -> Result<Vec<Reading>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows: Vec<ReadingRow> = sqlx::query_as(LIST_RECENT_SQL)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.inner())
            .await?;

        rows.into_iter().map(row_to_reading).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM readings")
            .fetch_one(self.pool.inner())
            .await?;
        u64::try_from(count).map_err(|_| StoreError::InvalidData(format!("negative count: {count}")))
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<DeleteOutcome, StoreError> {
        let mut outcome = DeleteOutcome::default();

        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            match self.delete_chunk(chunk).await {
                Ok(deleted) => outcome.deleted += deleted,
                Err(e) => {
                    tracing::warn!(error = %e, chunk_len = chunk.len(), "Delete chunk failed");
                    outcome.failed_ids.extend(chunk.iter().cloned());
                }
            }
        }

        Ok(outcome)
    }
}
