//! Entity Extractor Port.

use async_trait::async_trait;

use super::CapabilityError;
use crate::domain::conversation::Turn;
use crate::domain::entities::{Extraction, SchemaSet};
use crate::domain::foundation::ThreadId;

/// Turns a message into partial records per entity type.
///
/// May return an empty extraction when nothing is recognized.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
        schemas: &SchemaSet,
    ) -> Result<Extraction, CapabilityError>;
}
