//! Extraction module - merging extracted fields, tracking what is missing,
//! and packaging completed entities for persistence.

mod finalize;
mod merge;
mod missing;

pub use finalize::{FinalizeBatch, FinalizedEntity};
pub use merge::{MergeEngine, MergeReport};
pub use missing::{ClarificationPrompt, MissingField, MissingFieldResolver};
