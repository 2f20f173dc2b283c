//! File-based Conversation Storage Adapter
//!
//! Stores each conversation record as one YAML file under a base directory,
//! so threads survive process restarts and can be inspected by hand.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::ThreadId;
use crate::ports::{ConversationStorage, ConversationStorageError};

/// File-based storage for conversation records
#[derive(Debug, Clone)]
pub struct FileConversationStorage {
    base_path: PathBuf,
}

impl FileConversationStorage {
    /// Create a new file storage with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileConversationStorage::new("./data/conversations");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn record_path(&self, thread_id: &ThreadId) -> PathBuf {
        self.base_path
            .join(format!("{}.yaml", thread_id.to_file_stem()))
    }

    async fn ensure_dir(&self) -> Result<(), ConversationStorageError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| ConversationStorageError::IoError(e.to_string()))
    }
}

#[async_trait]
impl ConversationStorage for FileConversationStorage {
    async fn load(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<ConversationRecord>, ConversationStorageError> {
        let file_path = self.record_path(thread_id);

        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConversationStorageError::IoError(e.to_string())),
        };

        let record: ConversationRecord = serde_yaml::from_str(&yaml)
            .map_err(|e| ConversationStorageError::DeserializationFailed(e.to_string()))?;

        // Distinct ids can share a file stem after sanitising.
        if record.thread_id() != thread_id {
            return Err(ConversationStorageError::DeserializationFailed(format!(
                "{} holds thread {}, expected {}",
                file_path.display(),
                record.thread_id(),
                thread_id
            )));
        }
        Ok(Some(record))
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), ConversationStorageError> {
        self.ensure_dir().await?;

        let yaml = serde_yaml::to_string(record)
            .map_err(|e| ConversationStorageError::SerializationFailed(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written record.
        let file_path = self.record_path(record.thread_id());
        let tmp_path = file_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .await
            .map_err(|e| ConversationStorageError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| ConversationStorageError::IoError(e.to_string()))?;

        tracing::debug!(thread_id = %record.thread_id(), path = %file_path.display(), "Saved conversation");
        Ok(())
    }

    async fn exists(&self, thread_id: &ThreadId) -> Result<bool, ConversationStorageError> {
        fs::try_exists(self.record_path(thread_id))
            .await
            .map_err(|e| ConversationStorageError::IoError(e.to_string()))
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<(), ConversationStorageError> {
        match fs::remove_file(self.record_path(thread_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConversationStorageError::IoError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{PendingInstance, Turn};
    use crate::domain::entities::PartialRecord;
    use tempfile::TempDir;

    fn thread(id: &str) -> ThreadId {
        ThreadId::new(id).unwrap()
    }

    #[tokio::test]
    async fn record_survives_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let storage = FileConversationStorage::new(dir.path());

        let mut record = ConversationRecord::new(thread("chat-1"));
        record.push_turn(Turn::user("went to the gym"), 20);
        record.pending_entities_mut().insert(
            "exercise".to_string(),
            vec![PendingInstance::new(
                PartialRecord::new().with("exercise_type", "gym").with_absent("duration_minutes"),
                1,
            )],
        );
        storage.save(&record).await.unwrap();

        assert!(dir.path().join("chat-1.yaml").exists());
        let loaded = storage.load(&thread("chat-1")).await.unwrap().unwrap();
        assert_eq!(loaded.thread_id(), record.thread_id());
        assert_eq!(loaded.history().len(), 1);
        assert_eq!(loaded.history()[0].text, "went to the gym");
        assert_eq!(loaded.pending_entities(), record.pending_entities());
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileConversationStorage::new(dir.path().join("not-yet-created"));

        assert!(storage.load(&thread("chat-1")).await.unwrap().is_none());
        assert!(!storage.exists(&thread("chat-1")).await.unwrap());
    }

    #[tokio::test]
    async fn colliding_file_stem_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = FileConversationStorage::new(dir.path());
        storage
            .save(&ConversationRecord::new(thread("a/b")))
            .await
            .unwrap();

        let result = storage.load(&thread("a:b")).await;
        assert!(matches!(
            result,
            Err(ConversationStorageError::DeserializationFailed(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_yaml_is_a_deserialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("chat-1.yaml"), "{{ not yaml").unwrap();
        let storage = FileConversationStorage::new(dir.path());

        assert!(matches!(
            storage.load(&thread("chat-1")).await,
            Err(ConversationStorageError::DeserializationFailed(_))
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileConversationStorage::new(dir.path());
        storage
            .save(&ConversationRecord::new(thread("chat-1")))
            .await
            .unwrap();

        storage.delete(&thread("chat-1")).await.unwrap();
        storage.delete(&thread("chat-1")).await.unwrap();
        assert!(!storage.exists(&thread("chat-1")).await.unwrap());
    }
}
