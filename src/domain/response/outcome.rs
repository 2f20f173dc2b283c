//! Turn outcomes - what a turn decided, before rendering.

use crate::domain::extraction::{ClarificationPrompt, FinalizedEntity};

/// Why the safety check refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    Injection,
    Crisis,
}

/// Result of handing finalized entities to document sync.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Sync disabled or nothing to sync.
    #[default]
    Skipped,
    Synced,
    /// Sync failed for these entity types; persistence still succeeded.
    Degraded { failed: Vec<String> },
}

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Clarify {
        prompts: Vec<ClarificationPrompt>,
    },
    Confirm {
        entities: Vec<FinalizedEntity>,
        sync: SyncStatus,
    },
    QueryAnswer(String),
    Chitchat(String),
    Refused(RefusalReason),
    Error,
}

impl TurnOutcome {
    /// Short tag for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            TurnOutcome::Clarify { .. } => "clarify",
            TurnOutcome::Confirm { .. } => "confirm",
            TurnOutcome::QueryAnswer(_) => "query-answer",
            TurnOutcome::Chitchat(_) => "chitchat",
            TurnOutcome::Refused(_) => "refused",
            TurnOutcome::Error => "error",
        }
    }
}
