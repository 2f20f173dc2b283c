//! Finalized entities handed to persistence.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::PendingEntities;
use crate::domain::entities::PartialRecord;
use crate::domain::foundation::{BatchId, ThreadId, Timestamp};

/// One fully-populated entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedEntity {
    pub entity_type: String,
    pub fields: PartialRecord,
}

/// Everything finalized by one turn.
///
/// `batch_id` identifies the finalize call; `(batch_id, position)` is the
/// idempotency key for each entity when persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeBatch {
    pub batch_id: BatchId,
    pub thread_id: ThreadId,
    pub entities: Vec<FinalizedEntity>,
    pub finalized_at: Timestamp,
}

impl FinalizeBatch {
    /// Collects every pending instance, ordered by entity type then instance.
    pub fn from_pending(thread_id: ThreadId, pending: &PendingEntities) -> Self {
        let entities = pending
            .iter()
            .flat_map(|(entity_type, list)| {
                list.iter().map(move |inst| FinalizedEntity {
                    entity_type: entity_type.clone(),
                    fields: inst.fields.clone(),
                })
            })
            .collect();
        Self {
            batch_id: BatchId::new(),
            thread_id,
            entities,
            finalized_at: Timestamp::now(),
        }
    }

    /// Entity types in the batch, without repeats, in batch order.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for entity in &self.entities {
            if !types.contains(&entity.entity_type.as_str()) {
                types.push(&entity.entity_type);
            }
        }
        types
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
