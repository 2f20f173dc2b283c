//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - LLM provider plus the LLM-backed classifier, extractor, chat and analytics
//! - `safety` - Pattern-based input guard
//! - `records` - Finalized-record stores (SQLite, in-memory)
//! - `sync` - Document sync (Notion, no-op)
//! - `storage` - Conversation record storage (YAML files, in-memory)

pub mod ai;
pub mod records;
pub mod safety;
pub mod storage;
pub mod sync;

pub use ai::{
    LlmAnalytics, LlmChatResponder, LlmEntityExtractor, LlmIntentClassifier, MockAIProvider,
    OpenAIConfig, OpenAIProvider, ScriptedChatResponder,
};
pub use records::{InMemoryRecordStore, SqliteRecordStore};
pub use safety::PatternSafetyGuard;
pub use storage::{FileConversationStorage, InMemoryConversationStorage};
pub use sync::{NoopDocumentSync, NotionConfig, NotionDocumentSync};
