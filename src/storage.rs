//! Storage Layer
//!
//! The store adapter holding the Series of readings:
//! - **Contract**: [`ReadingStore`] (insert, newest-first listing, count, batch delete)
//! - **Backends**: [`SqliteStore`] over a sqlx pool, [`MemoryStore`] in process
//!
//! # Components
//!
//! - [`Reading`] / [`NewReading`]: Persisted and not-yet-persisted samples
//! - [`DeleteOutcome`]: Partial-success report of a batch delete
//! - [`StorageBuilder`] / [`StorageHandles`]: Initialization and lifecycle management

mod builder;
pub mod db;
mod error;
mod memory;
pub mod schema;
mod sqlite_store;
mod traits;
mod types;

pub use builder::{MEMORY_URL, StorageBuilder, StorageHandles};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite_store::{DELETE_CHUNK_SIZE, SqliteStore};
pub use traits::{ReadingStore, bounded};
pub use types::{DeleteOutcome, NewReading, Reading};
