//! Intent Classifier Port.

use async_trait::async_trait;

use super::CapabilityError;
use crate::domain::conversation::{Intent, Turn};
use crate::domain::foundation::ThreadId;

/// Decides whether a message logs data, asks about it, or is something else.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// `history` excludes the current message.
    async fn classify(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
    ) -> Result<Intent, CapabilityError>;
}
