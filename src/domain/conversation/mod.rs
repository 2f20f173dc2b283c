//! Conversation domain module.
//!
//! Per-thread state, the turn history window, and the states a single
//! turn moves through.

mod intent;
mod record;
mod turn_state;

pub use intent::Intent;
pub use record::{transcript, ConversationRecord, PendingEntities, PendingInstance, Speaker, Turn};
pub use turn_state::TurnState;
