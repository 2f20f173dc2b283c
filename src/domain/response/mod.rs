//! Response module - turn outcomes and their rendering.

mod composer;
mod outcome;

pub use composer::{
    entity_summary, ResponseComposer, CONFIRM_HEADER, CRISIS_RESOURCES, INJECTION_REFUSAL,
    RETRY_MESSAGE,
};
pub use outcome::{RefusalReason, SyncStatus, TurnOutcome};
