//! In-memory result store (no persistence).
//!
//! Uses `Arc<RwLock<FxHashMap>>` for thread-safe storage. Records are lost
//! when the server restarts.

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ResultRecord, ResultStore};
use crate::error::{StoreError, StoreResult};

/// In-memory result store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<FxHashMap<String, ResultRecord>>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create(&self, id: &str, backend: &str, shots: u32) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        records.insert(id.to_string(), ResultRecord::pending(id, backend, shots));
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<ResultRecord>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn complete(&self, id: &str, payload: Value) -> StoreResult<bool> {
        let mut records = self.records.write().await;

        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if record.complete {
            return Ok(false);
        }

        record.result = Some(payload);
        record.complete = true;
        record.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn list_pending(&self) -> StoreResult<Vec<ResultRecord>> {
        let records = self.records.read().await;

        let mut pending: Vec<ResultRecord> =
            records.values().filter(|r| !r.complete).cloned().collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }
}
