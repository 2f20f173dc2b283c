//! Conversation Storage Port - persisting conversation records between
//! process runs.

use async_trait::async_trait;

use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::ThreadId;

/// Errors that can occur during conversation storage operations
#[derive(Debug, thiserror::Error)]
pub enum ConversationStorageError {
    #[error("Failed to serialize conversation: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize conversation: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting and loading conversation records
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Load a record, `None` if the thread has never been saved.
    async fn load(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<ConversationRecord>, ConversationStorageError>;

    /// Save (create or replace) a record.
    async fn save(&self, record: &ConversationRecord) -> Result<(), ConversationStorageError>;

    /// Check if a record exists for a thread.
    async fn exists(&self, thread_id: &ThreadId) -> Result<bool, ConversationStorageError>;

    /// Delete a thread's record. Deleting a missing record is not an error.
    async fn delete(&self, thread_id: &ThreadId) -> Result<(), ConversationStorageError>;
}
