//! Document Sync Port - best-effort mirroring of finalized entities to an
//! external document store.

use async_trait::async_trait;

use crate::domain::extraction::FinalizeBatch;

/// Errors from document sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Some entity types could not be synced after retries.
    #[error("failed to sync: {}", failed.join(", "))]
    Partial { failed: Vec<String> },

    #[error("document sync unavailable: {0}")]
    Unavailable(String),
}

impl SyncError {
    /// Entity types affected, given the batch that was synced.
    pub fn failed_types(&self, batch: &FinalizeBatch) -> Vec<String> {
        match self {
            SyncError::Partial { failed } => failed.clone(),
            SyncError::Unavailable(_) => batch.entity_types().into_iter().map(String::from).collect(),
        }
    }
}

#[async_trait]
pub trait DocumentSync: Send + Sync {
    async fn sync(&self, batch: &FinalizeBatch) -> Result<(), SyncError>;

    /// Whether sync does anything at all.
    fn is_enabled(&self) -> bool {
        true
    }
}
