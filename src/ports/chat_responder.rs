//! Chat Responder Port - short replies for messages that are neither logs
//! nor queries.

use async_trait::async_trait;

use super::CapabilityError;
use crate::domain::conversation::Turn;
use crate::domain::foundation::ThreadId;

#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn reply(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
    ) -> Result<String, CapabilityError>;
}
