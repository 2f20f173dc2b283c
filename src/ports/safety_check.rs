//! Safety Check Port - pass/reject verdict on raw user input.

use async_trait::async_trait;

use super::CapabilityError;
use crate::domain::response::RefusalReason;

/// Verdict of the safety check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    Pass,
    Reject { reason: RefusalReason },
}

impl SafetyVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, SafetyVerdict::Pass)
    }
}

/// Port consulted before any other work on a turn.
#[async_trait]
pub trait SafetyCheck: Send + Sync {
    async fn check(&self, text: &str) -> Result<SafetyVerdict, CapabilityError>;
}
