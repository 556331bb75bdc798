//! SQLite result store.
//!
//! One row per job. The terminal write is a conditional `UPDATE` inside a
//! transaction, so a record is completed at most once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;

use super::{ResultRecord, ResultStore};
use crate::error::{StoreError, StoreResult};

const COLUMNS: &str = "id, backend, shots, complete, result_json, created_at, completed_at";

/// SQLite result store.
///
/// All statements run on the blocking pool behind a single connection.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

/// A row as stored, before the payload is parsed.
struct RawRecord {
    id: String,
    backend: String,
    shots: u32,
    complete: bool,
    result_json: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            backend: row.get(1)?,
            shots: row.get(2)?,
            complete: row.get(3)?,
            result_json: row.get(4)?,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<ResultRecord> {
        let result = self
            .result_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(ResultRecord {
            id: self.id,
            backend: self.backend,
            shots: self.shots,
            complete: self.complete,
            result,
            created_at: DateTime::from_timestamp_millis(self.created_at).unwrap_or_else(Utc::now),
            completed_at: self
                .completed_at
                .and_then(DateTime::from_timestamp_millis),
        })
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// Blocks on file I/O; call it outside the async runtime or inside
    /// `spawn_blocking`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// A private in-memory database.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                backend TEXT NOT NULL,
                shots INTEGER NOT NULL,
                complete INTEGER NOT NULL DEFAULT 0,
                result_json TEXT,
                created_at INTEGER NOT NULL,
                completed_at INTEGER
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_complete ON results(complete, created_at)",
            [],
        )?;

        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.connection.clone();
        task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Backend("database lock poisoned".into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {e}")))?
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn create(&self, id: &str, backend: &str, shots: u32) -> StoreResult<()> {
        let record = ResultRecord::pending(id, backend, shots);
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO results (id, backend, shots, complete, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![
                    record.id,
                    record.backend,
                    record.shots,
                    record.created_at.timestamp_millis()
                ],
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Duplicate(record.id))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<ResultRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM results WHERE id = ?1"),
                params![id],
                RawRecord::from_row,
            )
            .optional()?
            .map(RawRecord::into_record)
            .transpose()
        })
        .await
    }

    async fn complete(&self, id: &str, payload: Value) -> StoreResult<bool> {
        let id = id.to_string();
        let payload = serde_json::to_string(&payload)?;
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE results SET complete = 1, result_json = ?2, completed_at = ?3
                 WHERE id = ?1 AND complete = 0",
                params![id, payload, Utc::now().timestamp_millis()],
            )?;
            if updated == 0 {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM results WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )?;
                tx.commit()?;
                return if exists {
                    Ok(false)
                } else {
                    Err(StoreError::NotFound(id))
                };
            }
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn list_pending(&self) -> StoreResult<Vec<ResultRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM results WHERE complete = 0 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map([], RawRecord::from_row)?;
            rows.map(|row| row.map_err(StoreError::from)?.into_record())
                .collect()
        })
        .await
    }
}
