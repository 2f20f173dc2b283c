//! Conversation record - the unit of per-thread state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Intent;
use crate::domain::entities::{PartialRecord, SchemaSet};
use crate::domain::extraction::{MissingField, MissingFieldResolver};
use crate::domain::foundation::{ThreadId, Timestamp};

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Set on user turns once the turn reached a decided outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub at: Timestamp,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            intent: None,
            at: Timestamp::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            intent: None,
            at: Timestamp::now(),
        }
    }
}

/// A pending, not yet finalized, entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInstance {
    pub fields: PartialRecord,
    /// `turn_seq` of the last merge that touched this instance.
    pub touched_turn: u64,
}

impl PendingInstance {
    pub fn new(fields: PartialRecord, touched_turn: u64) -> Self {
        Self {
            fields,
            touched_turn,
        }
    }
}

/// Pending instances keyed by entity type.
pub type PendingEntities = BTreeMap<String, Vec<PendingInstance>>;

/// Per-thread conversation state.
///
/// `missing_fields` is derived from `pending_entities` and written only by
/// [`ConversationRecord::refresh_missing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    thread_id: ThreadId,
    history: Vec<Turn>,
    #[serde(skip)]
    intent: Option<Intent>,
    pending_entities: PendingEntities,
    missing_fields: Vec<MissingField>,
    last_response: Option<String>,
    turn_seq: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ConversationRecord {
    /// Creates an empty record for a thread.
    pub fn new(thread_id: ThreadId) -> Self {
        let now = Timestamp::now();
        Self {
            thread_id,
            history: Vec::new(),
            intent: None,
            pending_entities: BTreeMap::new(),
            missing_fields: Vec::new(),
            last_response: None,
            turn_seq: 0,
            created_at: now,
            updated_at: now,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn pending_entities(&self) -> &PendingEntities {
        &self.pending_entities
    }

    pub fn missing_fields(&self) -> &[MissingField] {
        &self.missing_fields
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn turn_seq(&self) -> u64 {
        self.turn_seq
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns true if any entity is pending.
    pub fn has_pending(&self) -> bool {
        !self.pending_entities.is_empty()
    }

    /// Returns true if pending entities still lack required fields.
    pub fn is_awaiting_clarification(&self) -> bool {
        !self.missing_fields.is_empty()
    }

    // ───────────────────────────────────────────────────────────────
    // Mutation
    // ───────────────────────────────────────────────────────────────

    /// Appends a turn, keeping at most `window` turns (oldest dropped first).
    pub fn push_turn(&mut self, turn: Turn, window: usize) {
        self.history.push(turn);
        if self.history.len() > window {
            let excess = self.history.len() - window;
            self.history.drain(..excess);
        }
        self.updated_at = Timestamp::now();
    }

    /// Records the decided intent on the current turn and its user history entry.
    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = Some(intent);
        if let Some(turn) = self
            .history
            .iter_mut()
            .rev()
            .find(|t| t.speaker == Speaker::User)
        {
            turn.intent = Some(intent);
        }
    }

    /// Forgets the turn-scoped intent.
    pub fn clear_intent(&mut self) {
        self.intent = None;
    }

    /// Advances and returns the turn sequence number.
    pub fn next_turn_seq(&mut self) -> u64 {
        self.turn_seq += 1;
        self.turn_seq
    }

    /// Mutable access for the merge engine.
    ///
    /// Callers must follow up with [`ConversationRecord::refresh_missing`].
    pub fn pending_entities_mut(&mut self) -> &mut PendingEntities {
        &mut self.pending_entities
    }

    /// Replaces pending entities wholesale and recomputes missing fields.
    pub fn restore_pending(
        &mut self,
        pending: PendingEntities,
        resolver: &MissingFieldResolver,
        schemas: &SchemaSet,
    ) {
        self.pending_entities = pending;
        self.refresh_missing(resolver, schemas);
    }

    /// Recomputes `missing_fields` from the pending entities.
    pub fn refresh_missing(&mut self, resolver: &MissingFieldResolver, schemas: &SchemaSet) {
        self.missing_fields = resolver.resolve(&self.pending_entities, schemas);
        self.updated_at = Timestamp::now();
    }

    /// Clears pending entities and missing fields together.
    pub fn clear_pending(&mut self) {
        self.pending_entities.clear();
        self.missing_fields.clear();
        self.updated_at = Timestamp::now();
    }

    pub fn set_last_response(&mut self, response: impl Into<String>) {
        self.last_response = Some(response.into());
        self.updated_at = Timestamp::now();
    }
}

/// The last `n` turns as `speaker: text` lines.
pub fn transcript(turns: &[Turn], n: usize) -> String {
    let start = turns.len().saturating_sub(n);
    turns[start..]
        .iter()
        .map(|t| format!("{}: {}", t.speaker.as_str(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}
