//! Persistence for probe measurements
//!
//! The monitor loop only depends on the `MeasurementStore` trait, so the
//! backend can be swapped without touching the scheduler or the command
//! handler.
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded database with WAL mode and migrations
//! - **In-Memory**: no persistence, used by tests and `backend = "none"`
//!
//! ## Usage
//!
//! ```no_run
//! use ping_monitor::storage::{MeasurementStore, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::new("./ping_metrics.db").await?;
//!     println!("{:?}", store.distinct_hosts().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod retention;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{DEFAULT_QUERY_LIMIT, HealthStatus, MeasurementQuery, MeasurementStore, TimeWindow};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{HostSummary, StoredMeasurement};
