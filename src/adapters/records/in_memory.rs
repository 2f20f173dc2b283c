//! In-memory record store for tests and ephemeral runs.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::extraction::FinalizeBatch;
use crate::domain::foundation::ThreadId;
use crate::ports::{RecordReader, RecordSink, RecordStoreError, StoredRecord};

/// Records kept in insertion order; `(batch_id, position)` is unique.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<StoredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records.
    pub async fn all(&self) -> Vec<StoredRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordSink for InMemoryRecordStore {
    async fn persist(&self, batch: &FinalizeBatch) -> Result<(), RecordStoreError> {
        let mut records = self.records.write().await;
        for (position, entity) in batch.entities.iter().enumerate() {
            let position = position as u32;
            let duplicate = records
                .iter()
                .any(|r| r.batch_id == batch.batch_id && r.position == position);
            if duplicate {
                continue;
            }
            records.push(StoredRecord {
                batch_id: batch.batch_id,
                position,
                thread_id: batch.thread_id.clone(),
                entity_type: entity.entity_type.clone(),
                date: batch.finalized_at.date(),
                data: entity.fields.to_json(),
                created_at: batch.finalized_at,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordReader for InMemoryRecordStore {
    async fn entity_types(&self, thread_id: &ThreadId) -> Result<Vec<String>, RecordStoreError> {
        let records = self.records.read().await;
        let mut types: Vec<String> = records
            .iter()
            .filter(|r| &r.thread_id == thread_id)
            .map(|r| r.entity_type.clone())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }

    async fn recent(
        &self,
        thread_id: &ThreadId,
        entity_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| &r.thread_id == thread_id && r.entity_type == entity_type)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
