//! AI Adapters.
//!
//! LLM providers and the capability adapters built on top of them.
//!
//! ## Available Adapters
//!
//! - `OpenAIProvider` - OpenAI chat completions
//! - `MockAIProvider` - Configurable mock for testing
//! - `LlmIntentClassifier` - log / query / other via the provider
//! - `LlmEntityExtractor` - schema-driven extraction via the provider
//! - `LlmChatResponder` / `ScriptedChatResponder` - conversational replies
//! - `LlmAnalytics` - answers over stored records

mod json_reply;
mod llm_analytics;
mod llm_chat;
mod llm_classifier;
mod llm_extractor;
mod mock_provider;
mod openai_provider;

pub use json_reply::parse_json_reply;
pub use llm_analytics::{markdown_table, LlmAnalytics, NO_DATA_ANSWER};
pub use llm_chat::{LlmChatResponder, ScriptedChatResponder};
pub use llm_classifier::LlmIntentClassifier;
pub use llm_extractor::LlmEntityExtractor;
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
