//! Analytics Port - answers questions about previously logged data.

use async_trait::async_trait;

use super::CapabilityError;
use crate::domain::foundation::ThreadId;

#[async_trait]
pub trait Analytics: Send + Sync {
    async fn answer(&self, thread_id: &ThreadId, question: &str) -> Result<String, CapabilityError>;
}
