//! Application layer - wires the domain to its collaborators.
//!
//! - `SessionStore` serializes access to each thread's record
//! - `TurnRouter` runs one turn through the state machine

mod session_store;
mod turn_router;

pub use session_store::{ScopedRecord, SessionError, SessionStore};
pub use turn_router::{sanitize_input, Collaborators, RouterConfig, TurnError, TurnRouter};
