//! Storage Adapters
//!
//! Implementations of the ConversationStorage port.
//!
//! ## Available Adapters
//!
//! - **FileConversationStorage** - One YAML file per thread on disk
//! - **InMemoryConversationStorage** - Records in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileConversationStorage, InMemoryConversationStorage};
//!
//! // Production: file-based storage
//! let storage = FileConversationStorage::new("./data/conversations");
//!
//! // Testing: in-memory storage
//! let storage = InMemoryConversationStorage::new();
//! ```

mod file_conversation_storage;
mod in_memory_conversation_storage;

pub use file_conversation_storage::FileConversationStorage;
pub use in_memory_conversation_storage::InMemoryConversationStorage;
