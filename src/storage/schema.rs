//! Database schema definitions.

use crate::storage::StoreError;
use crate::storage::db::SqlitePool;

/// SQL statement for creating the readings collection.
///
/// `seq` is the insertion sequence and breaks ties between equal `stored_at` values.
/// `id` is the opaque document identifier handed out to callers.
/// `stored_at` holds Unix milliseconds assigned by the insert statement.
pub const READINGS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS readings (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT    NOT NULL UNIQUE,
    latitude   REAL    NOT NULL,
    longitude  REAL    NOT NULL,
    altitude   REAL    NOT NULL,
    velocity   REAL    NOT NULL,
    timestamp  REAL    NOT NULL,
    stored_at  INTEGER NOT NULL
);
"#;

/// Index backing the newest-first scans used by reads and trims.
pub const READINGS_STORED_AT_INDEX_DDL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_readings_stored_at ON readings (stored_at DESC, seq DESC);
"#;

/// Initialize the database schema.
///
/// Creates the readings table and its index if they don't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(READINGS_TABLE_DDL)
        .execute(pool.inner())
        .await?;
    sqlx::query(READINGS_STORED_AT_INDEX_DDL)
        .execute(pool.inner())
        .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}
