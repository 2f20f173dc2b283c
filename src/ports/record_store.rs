//! Record Store Ports - durable storage of finalized entities.
//!
//! `RecordSink` is the write side used at finalize; `RecordReader` is the
//! read side used by analytics.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::extraction::FinalizeBatch;
use crate::domain::foundation::{BatchId, ThreadId, Timestamp};

/// Errors from record storage.
#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted entity as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub batch_id: BatchId,
    pub position: u32,
    pub thread_id: ThreadId,
    pub entity_type: String,
    pub date: NaiveDate,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
}

/// Write side: persists a finalize batch.
///
/// Implementations must be idempotent per `(batch_id, position)` so that
/// retrying the same batch never duplicates records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn persist(&self, batch: &FinalizeBatch) -> Result<(), RecordStoreError>;
}

/// Read side: recent records for a thread.
#[async_trait]
pub trait RecordReader: Send + Sync {
    /// Entity types the thread has records for, in name order.
    async fn entity_types(&self, thread_id: &ThreadId) -> Result<Vec<String>, RecordStoreError>;

    /// Newest first, at most `limit`.
    async fn recent(
        &self,
        thread_id: &ThreadId,
        entity_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, RecordStoreError>;
}
