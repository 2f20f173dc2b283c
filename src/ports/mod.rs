//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the conversation engine and its collaborators. Adapters implement them.
//!
//! ## Capability Ports
//!
//! - `SafetyCheck` - pass/reject verdict on raw input
//! - `IntentClassifier` - log / query / other
//! - `EntityExtractor` - partial records per entity type
//! - `Analytics` - answers about logged data
//! - `ChatResponder` - short conversational replies
//!
//! ## Storage Ports
//!
//! - `RecordSink` / `RecordReader` - finalized entities
//! - `DocumentSync` - best-effort mirror to an external document store
//! - `ConversationStorage` - conversation records between runs
//!
//! ## Provider Ports
//!
//! - `AIProvider` - LLM completions used by the capability adapters

mod ai_provider;
mod analytics;
mod capability;
mod chat_responder;
mod conversation_storage;
mod document_sync;
mod entity_extractor;
mod intent_classifier;
mod record_store;
mod safety_check;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, RequestMetadata, TokenUsage,
};
pub use analytics::Analytics;
pub use capability::CapabilityError;
pub use chat_responder::ChatResponder;
pub use conversation_storage::{ConversationStorage, ConversationStorageError};
pub use document_sync::{DocumentSync, SyncError};
pub use entity_extractor::EntityExtractor;
pub use intent_classifier::IntentClassifier;
pub use record_store::{RecordReader, RecordSink, RecordStoreError, StoredRecord};
pub use safety_check::{SafetyCheck, SafetyVerdict};
