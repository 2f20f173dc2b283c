//! In-Memory Conversation Storage Adapter
//!
//! Keeps conversation records in a map. Used in tests and when no
//! conversation directory is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::ThreadId;
use crate::ports::{ConversationStorage, ConversationStorageError};

/// In-memory storage for conversation records
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStorage {
    records: Arc<RwLock<HashMap<ThreadId, ConversationRecord>>>,
}

impl InMemoryConversationStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored records (useful for tests)
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStorage for InMemoryConversationStorage {
    async fn load(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<ConversationRecord>, ConversationStorageError> {
        Ok(self.records.read().await.get(thread_id).cloned())
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), ConversationStorageError> {
        self.records
            .write()
            .await
            .insert(record.thread_id().clone(), record.clone());
        Ok(())
    }

    async fn exists(&self, thread_id: &ThreadId) -> Result<bool, ConversationStorageError> {
        Ok(self.records.read().await.contains_key(thread_id))
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<(), ConversationStorageError> {
        self.records.write().await.remove(thread_id);
        Ok(())
    }
}
