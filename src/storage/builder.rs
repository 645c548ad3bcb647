//! Storage builder and handles.
//!
//! Provides a builder pattern for constructing the storage layer
//! and a handles struct for accessing the store.

use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::StoreError;
use crate::storage::db::{DEFAULT_MAX_CONNECTIONS, SqlitePool};
use crate::storage::memory::MemoryStore;
use crate::storage::schema::init_schema;
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::traits::ReadingStore;

/// Database URL selecting the in-process [`MemoryStore`].
pub const MEMORY_URL: &str = "memory";

/// Builder for constructing the storage layer.
pub struct StorageBuilder {
    url: String,
    max_connections: u32,
}

impl StorageBuilder {
    /// Create a new storage builder.
    ///
    /// `url` is either a SQLite URL (`sqlite:data/isstrack.db?mode=rwc`,
    /// `sqlite::memory:`) or [`MEMORY_URL`].
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Set the connection pool size.
    pub fn max_connections(mut self, size: u32) -> Self {
        self.max_connections = size;
        self
    }

    /// Connect, initialize the schema and return handles.
    ///
    /// Failing here is the one unrecoverable storage condition: the process
    /// must not report itself healthy without a store.
    pub async fn build(self) -> Result<StorageHandles, StoreError> {
        if self.url == MEMORY_URL {
            tracing::info!("Using in-memory store");
            return Ok(StorageHandles {
                store: Arc::new(MemoryStore::new()),
                pool: None,
            });
        }

        // Create parent directory if it doesn't exist
        if let Some(path) = sqlite_file_path(&self.url)
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Internal(format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pool = SqlitePool::connect(&self.url, self.max_connections).await?;
        init_schema(&pool).await?;

        Ok(StorageHandles {
            store: Arc::new(SqliteStore::new(pool.clone())),
            pool: Some(pool),
        })
    }
}

/// Extract the file path from a SQLite URL, if it names a file.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Handles to the storage layer.
#[derive(Clone)]
pub struct StorageHandles {
    /// The reading store shared by the sampler, trimmer and query surface.
    pub store: Arc<dyn ReadingStore>,
    pool: Option<SqlitePool>,
}

impl StorageHandles {
    /// Gracefully shutdown the storage layer.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StorageHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandles")
            .field("sqlite", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewReading;
    use tempfile::tempdir;

    fn sample() -> NewReading {
        NewReading {
            latitude: 51.5,
            longitude: -0.1,
            altitude: 420.0,
            velocity: 27_580.0,
            timestamp: 1_700_000_123.0,
        }
    }

    #[tokio::test]
    async fn test_storage_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let url = format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("nested/roundtrip.db").display()
        );

        // Phase 1: write and close
        {
            let handles = StorageBuilder::new(&url).build().await.unwrap();
            for _ in 0..5 {
                handles.store.insert(sample()).await.unwrap();
            }
            handles.shutdown().await.unwrap();
        }

        // Phase 2: reopen and read
        let handles = StorageBuilder::new(&url).build().await.unwrap();
        assert_eq!(handles.store.count().await.unwrap(), 5);
        let latest = handles.store.list_recent(Some(1), 0).await.unwrap();
        assert_eq!(latest[0].fields(), sample());
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_url_builds_memory_store() {
        let handles = StorageBuilder::new(MEMORY_URL).build().await.unwrap();
        handles.store.insert(sample()).await.unwrap();
        assert_eq!(handles.store.count().await.unwrap(), 1);
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_fails_on_unreachable_database() {
        let dir = tempdir().unwrap();
        // A directory is not a database file.
        let url = format!("sqlite:{}?mode=ro", dir.path().display());
        assert!(StorageBuilder::new(url).build().await.is_err());
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite:data/isstrack.db?mode=rwc"),
            Some(PathBuf::from("data/isstrack.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/x.db"),
            Some(PathBuf::from("/tmp/x.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/db"), None);
    }
}
