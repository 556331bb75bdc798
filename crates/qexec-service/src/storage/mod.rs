//! Result store backends.
//!
//! A result record is created when a job is accepted and completed exactly
//! once by the worker that ran it:
//!
//! - `MemoryStore`: In-memory storage (no persistence)
//! - `SqliteStore`: `SQLite` database for single-node deployments

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::StoreResult;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Persisted outcome of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Job id.
    pub id: String,
    /// Backend name as requested.
    pub backend: String,
    pub shots: u32,
    /// Whether the terminal payload has been written.
    pub complete: bool,
    /// Histogram or error payload, present once complete.
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    /// A freshly accepted job.
    pub fn pending(id: impl Into<String>, backend: impl Into<String>, shots: u32) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            shots,
            complete: false,
            result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Trait for result store backends.
///
/// Implementations must be thread-safe (Send + Sync). The terminal write is
/// keyed by id and must not be lost to concurrent readers.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Create a pending record. Fails with `Duplicate` if the id exists.
    async fn create(&self, id: &str, backend: &str, shots: u32) -> StoreResult<()>;

    /// Get a record by id.
    async fn get(&self, id: &str) -> StoreResult<Option<ResultRecord>>;

    /// Write the terminal payload.
    ///
    /// Returns `true` for the first terminal write and `false` if the record
    /// was already complete, in which case it is left untouched.
    async fn complete(&self, id: &str, payload: Value) -> StoreResult<bool>;

    /// Records still waiting for a terminal write, oldest first.
    async fn list_pending(&self) -> StoreResult<Vec<ResultRecord>>;
}
