//! Turn Router - drives one conversational turn end to end.
//!
//! ```text
//! Start -> GuardChecked -> Classified -> Extracting -> AwaitingClarification -> Done
//!                |                  |            \-> Finalizing -------------> Done
//!                |                  |-> Querying ------------------------------> Done
//!                |                  \-> Chitchatting --------------------------> Done
//!                \-> Done (refused)
//! ```
//!
//! Collaborator failures are caught at the state that invoked them. Pending
//! entities are only written back once the turn has decided its outcome, so
//! a failed turn leaves them exactly as they were.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::session_store::{SessionError, SessionStore};
use crate::domain::conversation::{ConversationRecord, Intent, PendingEntities, Turn, TurnState};
use crate::domain::entities::{Extraction, PartialRecord, SchemaSet};
use crate::domain::extraction::{FinalizeBatch, MergeEngine, MissingFieldResolver};
use crate::domain::foundation::{StateMachine, ThreadId, ValidationError};
use crate::domain::response::{RefusalReason, ResponseComposer, SyncStatus, TurnOutcome, RETRY_MESSAGE};
use crate::ports::{
    Analytics, CapabilityError, ChatResponder, DocumentSync, EntityExtractor, IntentClassifier,
    RecordSink, RecordStoreError, SafetyCheck, SafetyVerdict, SyncError,
};

const TRUNCATION_MARKER: &str = "... [truncated]";
const JOURNAL_ENTITY: &str = "journal";
const JOURNAL_FIELD: &str = "note";

/// Why a turn did not reach its normal outcome.
///
/// Mapped to a [`TurnOutcome`] at the router boundary and never rendered.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("message refused: {0:?}")]
    SafetyRejected(RefusalReason),

    #[error("safety check failed: {0}")]
    SafetyCheckFailed(CapabilityError),

    #[error("classification failed: {0}")]
    ClassificationFailed(CapabilityError),

    #[error("extraction failed: {0}")]
    ExtractionFailed(CapabilityError),

    #[error("persistence failed: {0}")]
    PersistenceFailed(RecordStoreError),

    #[error("document sync failed: {0}")]
    SyncFailed(SyncError),

    #[error("analytics failed: {0}")]
    AnalyticsFailed(CapabilityError),

    #[error("chat reply failed: {0}")]
    ChitchatFailed(CapabilityError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("invalid turn transition: {0}")]
    InvalidTransition(#[from] ValidationError),
}

impl TurnError {
    /// The outcome rendered for this failure.
    pub fn outcome(&self) -> TurnOutcome {
        match self {
            TurnError::SafetyRejected(reason) => TurnOutcome::Refused(*reason),
            _ => TurnOutcome::Error,
        }
    }
}

/// Router tuning.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Turns kept in a record's history.
    pub history_window: usize,
    /// Longer inputs are truncated before the safety check.
    pub max_input_chars: usize,
    /// Save unrecognized log messages as journal notes.
    pub journal_fallback: bool,
    /// Upper bound on every collaborator call.
    pub collaborator_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            history_window: 20,
            max_input_chars: 2000,
            journal_fallback: true,
            collaborator_timeout: Duration::from_secs(30),
        }
    }
}

/// The external capabilities a turn consults.
#[derive(Clone)]
pub struct Collaborators {
    pub safety: Arc<dyn SafetyCheck>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub extractor: Arc<dyn EntityExtractor>,
    pub sink: Arc<dyn RecordSink>,
    pub sync: Arc<dyn DocumentSync>,
    pub analytics: Arc<dyn Analytics>,
    pub chat: Arc<dyn ChatResponder>,
}

/// Entry point for inbound messages.
pub struct TurnRouter {
    sessions: SessionStore,
    schemas: Arc<SchemaSet>,
    collaborators: Collaborators,
    resolver: MissingFieldResolver,
    config: RouterConfig,
}

impl TurnRouter {
    pub fn new(
        sessions: SessionStore,
        schemas: Arc<SchemaSet>,
        collaborators: Collaborators,
        config: RouterConfig,
    ) -> Self {
        Self {
            sessions,
            schemas,
            collaborators,
            resolver: MissingFieldResolver,
            config,
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Handles one message and returns the rendered reply.
    ///
    /// Never fails: every failure path renders a short generic message.
    /// Safe to call concurrently; calls for the same thread are serialized.
    pub async fn handle_turn(&self, thread_id: &str, raw_text: &str) -> String {
        let span = tracing::info_span!("turn", thread_id = %thread_id);
        self.handle_turn_inner(thread_id, raw_text)
            .instrument(span)
            .await
    }

    async fn handle_turn_inner(&self, thread_id: &str, raw_text: &str) -> String {
        let thread_id = match ThreadId::new(thread_id) {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(error = %error, "Rejected invalid thread id");
                return RETRY_MESSAGE.to_string();
            }
        };

        let mut scoped = match self.sessions.acquire(&thread_id).await {
            Ok(scoped) => scoped,
            Err(error) => {
                tracing::error!(error = %TurnError::from(error), "Could not acquire session");
                return RETRY_MESSAGE.to_string();
            }
        };

        let text = sanitize_input(raw_text, self.config.max_input_chars);
        let mut state = TurnState::default();

        let outcome = match self.run(&mut scoped, &text, &mut state).await {
            Ok(outcome) => outcome,
            Err(error) => {
                let outcome = error.outcome();
                match &error {
                    TurnError::SafetyRejected(_) => {
                        tracing::info!(error = %error, "Turn refused")
                    }
                    TurnError::InvalidTransition(_) | TurnError::Session(_) => {
                        tracing::error!(error = %error, state = ?state, "Turn aborted")
                    }
                    _ => tracing::warn!(error = %error, state = ?state, "Turn failed"),
                }
                outcome
            }
        };

        let response = ResponseComposer::render(&outcome, &self.schemas);
        scoped.clear_intent();
        scoped.set_last_response(response.clone());
        scoped.push_turn(Turn::assistant(response.clone()), self.config.history_window);

        if let Err(error) = scoped.commit().await {
            tracing::error!(error = %TurnError::from(error), "Failed to commit conversation");
            return RETRY_MESSAGE.to_string();
        }

        tracing::info!(outcome = outcome.tag(), "Turn complete");
        response
    }

    /// Re-delivers the last rendered response for a thread.
    pub async fn last_response(&self, thread_id: &str) -> Option<String> {
        let thread_id = ThreadId::new(thread_id).ok()?;
        match self.sessions.acquire(&thread_id).await {
            Ok(scoped) => scoped.last_response().map(str::to_string),
            Err(error) => {
                tracing::warn!(thread_id = %thread_id, error = %error, "Could not read last response");
                None
            }
        }
    }

    async fn run(
        &self,
        record: &mut ConversationRecord,
        text: &str,
        state: &mut TurnState,
    ) -> Result<TurnOutcome, TurnError> {
        let turn_seq = record.next_turn_seq();
        record.push_turn(Turn::user(text), self.config.history_window);
        let history = prior_turns(record);
        let thread_id = record.thread_id().clone();

        let verdict = self
            .bounded(self.collaborators.safety.check(text), || CapabilityError::Timeout)
            .await
            .map_err(TurnError::SafetyCheckFailed)?;
        self.advance(state, TurnState::GuardChecked)?;
        if let SafetyVerdict::Reject { reason } = verdict {
            self.advance(state, TurnState::Done)?;
            return Err(TurnError::SafetyRejected(reason));
        }

        let intent = self
            .bounded(
                self.collaborators.classifier.classify(&thread_id, text, &history),
                || CapabilityError::Timeout,
            )
            .await
            .map_err(TurnError::ClassificationFailed)?;
        self.advance(state, TurnState::Classified)?;
        tracing::debug!(intent = %intent, "Classified message");

        let outcome = match intent {
            Intent::Log => self.log(record, text, &history, turn_seq, state).await?,
            Intent::Query => {
                self.advance(state, TurnState::Querying)?;
                let answer = self
                    .bounded(
                        self.collaborators.analytics.answer(&thread_id, text),
                        || CapabilityError::Timeout,
                    )
                    .await
                    .map_err(TurnError::AnalyticsFailed)?;
                TurnOutcome::QueryAnswer(answer)
            }
            Intent::Other => self.chitchat(&thread_id, text, &history, state).await?,
        };

        self.advance(state, TurnState::Done)?;
        record.set_intent(intent);
        Ok(outcome)
    }

    async fn log(
        &self,
        record: &mut ConversationRecord,
        text: &str,
        history: &[Turn],
        turn_seq: u64,
        state: &mut TurnState,
    ) -> Result<TurnOutcome, TurnError> {
        self.advance(state, TurnState::Extracting)?;
        let thread_id = record.thread_id().clone();

        let extraction = self
            .bounded(
                self.collaborators
                    .extractor
                    .extract(&thread_id, text, history, &self.schemas),
                || CapabilityError::Timeout,
            )
            .await
            .map_err(TurnError::ExtractionFailed)?;

        let mut pending = record.pending_entities().clone();
        let report = MergeEngine::apply(&mut pending, &extraction, &self.schemas, turn_seq);
        tracing::debug!(
            touched = ?report.touched,
            violations = report.violations.len(),
            discarded = report.discarded,
            "Merged extraction"
        );

        if report.touched.is_empty() {
            if record.is_awaiting_clarification() {
                self.advance(state, TurnState::AwaitingClarification)?;
                let prompts = self.resolver.prompts(record.missing_fields(), &self.schemas);
                return Ok(TurnOutcome::Clarify { prompts });
            }
            if !self.journal_fallback(&mut pending, text, turn_seq) {
                return self.chitchat(&thread_id, text, history, state).await;
            }
            tracing::info!("Nothing extracted, saving message as a journal note");
        }

        let missing = self.resolver.resolve(&pending, &self.schemas);
        if !missing.is_empty() {
            self.advance(state, TurnState::AwaitingClarification)?;
            record.restore_pending(pending, &self.resolver, &self.schemas);
            let prompts = self.resolver.prompts(record.missing_fields(), &self.schemas);
            return Ok(TurnOutcome::Clarify { prompts });
        }

        self.advance(state, TurnState::Finalizing)?;
        let batch = FinalizeBatch::from_pending(thread_id, &pending);
        self.bounded(self.collaborators.sink.persist(&batch), || {
            RecordStoreError::Unavailable("timed out".to_string())
        })
        .await
        .map_err(TurnError::PersistenceFailed)?;
        tracing::info!(
            batch_id = %batch.batch_id,
            entities = batch.entities.len(),
            "Finalized pending entities"
        );

        let sync = self.sync(&batch).await;
        record.clear_pending();
        Ok(TurnOutcome::Confirm {
            entities: batch.entities,
            sync,
        })
    }

    async fn chitchat(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
        state: &mut TurnState,
    ) -> Result<TurnOutcome, TurnError> {
        self.advance(state, TurnState::Chitchatting)?;
        let reply = self
            .bounded(
                self.collaborators.chat.reply(thread_id, text, history),
                || CapabilityError::Timeout,
            )
            .await
            .map_err(TurnError::ChitchatFailed)?;
        Ok(TurnOutcome::Chitchat(reply))
    }

    /// Stages the raw message as a journal note. Returns false when disabled
    /// or the schema set has no journal entity.
    fn journal_fallback(&self, pending: &mut PendingEntities, text: &str, turn_seq: u64) -> bool {
        if !self.config.journal_fallback || self.schemas.get(JOURNAL_ENTITY).is_none() {
            return false;
        }
        let mut extraction = Extraction::new();
        extraction.insert(
            JOURNAL_ENTITY.to_string(),
            vec![PartialRecord::new().with(JOURNAL_FIELD, text)],
        );
        !MergeEngine::apply(pending, &extraction, &self.schemas, turn_seq)
            .touched
            .is_empty()
    }

    /// Best-effort document sync; failures degrade the confirmation only.
    async fn sync(&self, batch: &FinalizeBatch) -> SyncStatus {
        if !self.collaborators.sync.is_enabled() {
            return SyncStatus::Skipped;
        }
        let result = self
            .bounded(self.collaborators.sync.sync(batch), || {
                SyncError::Unavailable("timed out".to_string())
            })
            .await;
        match result {
            Ok(()) => SyncStatus::Synced,
            Err(error) => {
                let failed = error.failed_types(batch);
                tracing::warn!(error = %TurnError::SyncFailed(error), "Document sync degraded");
                SyncStatus::Degraded { failed }
            }
        }
    }

    fn advance(&self, state: &mut TurnState, next: TurnState) -> Result<(), TurnError> {
        let from = *state;
        state.advance(next)?;
        tracing::debug!(from = ?from, to = ?next, "Turn transition");
        Ok(())
    }

    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce() -> E,
    ) -> Result<T, E> {
        match tokio::time::timeout(self.config.collaborator_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        }
    }
}

/// History before the current user turn.
fn prior_turns(record: &ConversationRecord) -> Vec<Turn> {
    match record.history().split_last() {
        Some((_, prior)) => prior.to_vec(),
        None => Vec::new(),
    }
}

/// Strips control characters (keeping newlines and tabs) and truncates to
/// `max_chars`.
pub fn sanitize_input(raw: &str, max_chars: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= max_chars {
        return cleaned.to_string();
    }
    tracing::warn!(original_len = cleaned.chars().count(), "Message truncated");
    let mut truncated: String = cleaned.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_short_input() {
        assert_eq!(sanitize_input("  went to the gym ", 2000), "went to the gym");
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize_input("a\u{0}b\u{7}c\nd", 100), "abc\nd");
    }

    #[test]
    fn sanitize_truncates_long_input_with_marker() {
        let long = "é".repeat(10);
        assert_eq!(sanitize_input(&long, 4), format!("éééé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn safety_rejection_maps_to_refusal() {
        assert_eq!(
            TurnError::SafetyRejected(RefusalReason::Crisis).outcome(),
            TurnOutcome::Refused(RefusalReason::Crisis)
        );
        assert_eq!(
            TurnError::ExtractionFailed(CapabilityError::Timeout).outcome(),
            TurnOutcome::Error
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = RouterConfig::default();
        assert_eq!(config.history_window, 20);
        assert_eq!(config.max_input_chars, 2000);
        assert!(config.journal_fallback);
        assert_eq!(config.collaborator_timeout, Duration::from_secs(30));
    }
}
