//! Session Store - keyed, serialized access to conversation records.
//!
//! Each thread id owns one slot guarded by a FIFO-fair `tokio::sync::Mutex`.
//! A [`ScopedRecord`] holds that lock for the duration of one turn and works
//! on a private copy of the record: [`ScopedRecord::commit`] publishes the
//! copy, dropping it without commit throws the copy away. Either way the lock
//! is released when the scope ends.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task;

use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::ThreadId;
use crate::ports::{ConversationStorage, ConversationStorageError};

type Slot = Arc<AsyncMutex<Option<ConversationRecord>>>;
type Holders = Arc<Mutex<HashMap<ThreadId, task::Id>>>;

/// Errors from acquiring or committing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The current task already holds this thread.
    #[error("thread {0} is already held by the current task")]
    Busy(ThreadId),

    #[error("conversation storage error: {0}")]
    Storage(#[from] ConversationStorageError),
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-thread mutual exclusion over conversation records.
pub struct SessionStore {
    storage: Arc<dyn ConversationStorage>,
    slots: Mutex<HashMap<ThreadId, Slot>>,
    holders: Holders,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn ConversationStorage>) -> Self {
        Self {
            storage,
            slots: Mutex::new(HashMap::new()),
            holders: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquires the record for `thread_id`, waiting while another task holds it.
    ///
    /// The record is loaded from storage, or created empty, on first use.
    /// Re-entrant acquisition from the task that already holds the thread
    /// fails with [`SessionError::Busy`]. Outside a tokio task re-entrancy
    /// cannot be detected.
    pub async fn acquire(&self, thread_id: &ThreadId) -> Result<ScopedRecord, SessionError> {
        let task_id = task::try_id();
        if let Some(id) = task_id {
            if locked(&self.holders).get(thread_id) == Some(&id) {
                tracing::error!(thread_id = %thread_id, "Re-entrant session acquisition");
                return Err(SessionError::Busy(thread_id.clone()));
            }
        }

        let slot = locked(&self.slots)
            .entry(thread_id.clone())
            .or_default()
            .clone();
        let mut guard = slot.lock_owned().await;

        let working = match guard.as_ref() {
            Some(record) => record.clone(),
            None => {
                let record = match self.storage.load(thread_id).await? {
                    Some(record) => record,
                    None => {
                        tracing::debug!(thread_id = %thread_id, "Creating conversation record");
                        ConversationRecord::new(thread_id.clone())
                    }
                };
                *guard = Some(record.clone());
                record
            }
        };

        if let Some(id) = task_id {
            locked(&self.holders).insert(thread_id.clone(), id);
        }

        Ok(ScopedRecord {
            guard,
            working,
            storage: Arc::clone(&self.storage),
            holders: Arc::clone(&self.holders),
            task_id,
        })
    }

    /// Number of threads seen so far.
    pub fn thread_count(&self) -> usize {
        locked(&self.slots).len()
    }
}

/// Exclusive, scoped access to one thread's record.
///
/// Derefs to the working copy. Changes become visible to later acquisitions
/// only through [`ScopedRecord::commit`].
pub struct ScopedRecord {
    guard: OwnedMutexGuard<Option<ConversationRecord>>,
    working: ConversationRecord,
    storage: Arc<dyn ConversationStorage>,
    holders: Holders,
    task_id: Option<task::Id>,
}

impl ScopedRecord {
    /// Persists the working copy, then publishes it to the slot.
    ///
    /// On a storage error nothing is published and the lock is released.
    pub async fn commit(mut self) -> Result<(), SessionError> {
        self.storage.save(&self.working).await?;
        *self.guard = Some(self.working.clone());
        Ok(())
    }
}

impl Deref for ScopedRecord {
    type Target = ConversationRecord;

    fn deref(&self) -> &Self::Target {
        &self.working
    }
}

impl DerefMut for ScopedRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.working
    }
}

impl Drop for ScopedRecord {
    fn drop(&mut self) {
        let Some(id) = self.task_id else { return };
        let mut holders = locked(&self.holders);
        if holders.get(self.working.thread_id()) == Some(&id) {
            holders.remove(self.working.thread_id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryConversationStorage;
    use crate::domain::conversation::Turn;
    use std::time::Duration;

    fn thread(id: &str) -> ThreadId {
        ThreadId::new(id).unwrap()
    }

    fn store() -> (SessionStore, InMemoryConversationStorage) {
        let storage = InMemoryConversationStorage::new();
        (SessionStore::new(Arc::new(storage.clone())), storage)
    }

    #[tokio::test]
    async fn first_acquire_creates_empty_record() {
        let (sessions, storage) = store();
        let scoped = sessions.acquire(&thread("chat-1")).await.unwrap();

        assert_eq!(scoped.thread_id(), &thread("chat-1"));
        assert!(scoped.history().is_empty());
        drop(scoped);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn committed_changes_are_visible_and_stored() {
        let (sessions, storage) = store();
        let mut scoped = sessions.acquire(&thread("chat-1")).await.unwrap();
        scoped.push_turn(Turn::user("hello"), 20);
        scoped.commit().await.unwrap();

        let again = sessions.acquire(&thread("chat-1")).await.unwrap();
        assert_eq!(again.history().len(), 1);
        assert!(storage.exists(&thread("chat-1")).await.unwrap());
    }

    #[tokio::test]
    async fn dropped_changes_are_discarded() {
        let (sessions, _) = store();
        {
            let mut scoped = sessions.acquire(&thread("chat-1")).await.unwrap();
            scoped.push_turn(Turn::user("never committed"), 20);
        }
        let again = sessions.acquire(&thread("chat-1")).await.unwrap();
        assert!(again.history().is_empty());
    }

    #[tokio::test]
    async fn existing_record_is_loaded_from_storage() {
        let storage = InMemoryConversationStorage::new();
        let mut record = ConversationRecord::new(thread("chat-1"));
        record.push_turn(Turn::user("from last run"), 20);
        storage.save(&record).await.unwrap();

        let sessions = SessionStore::new(Arc::new(storage));
        let scoped = sessions.acquire(&thread("chat-1")).await.unwrap();
        assert_eq!(scoped.history()[0].text, "from last run");
    }

    #[tokio::test]
    async fn reentrant_acquire_is_busy() {
        let (sessions, _) = store();
        let handle = tokio::spawn(async move {
            let _held = sessions.acquire(&thread("chat-1")).await.unwrap();
            let second = sessions.acquire(&thread("chat-1")).await;
            let other = sessions.acquire(&thread("chat-2")).await;
            (matches!(second, Err(SessionError::Busy(_))), other.is_ok())
        });

        let (busy, other_ok) = handle.await.unwrap();
        assert!(busy);
        assert!(other_ok);
    }

    #[tokio::test]
    async fn release_allows_same_task_to_acquire_again() {
        let (sessions, _) = store();
        let ok = tokio::spawn(async move {
            drop(sessions.acquire(&thread("chat-1")).await.unwrap());
            sessions.acquire(&thread("chat-1")).await.is_ok()
        })
        .await
        .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn second_task_waits_for_the_first() {
        let (sessions, _) = store();
        let sessions = Arc::new(sessions);

        let first = sessions.acquire(&thread("chat-1")).await.unwrap();

        let waiter = {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                let mut scoped = sessions.acquire(&thread("chat-1")).await.unwrap();
                let seen = scoped.history().len();
                scoped.push_turn(Turn::user("second"), 20);
                scoped.commit().await.unwrap();
                seen
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let mut first = first;
        first.push_turn(Turn::user("first"), 20);
        first.commit().await.unwrap();

        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(sessions.thread_count(), 1);
    }
}
