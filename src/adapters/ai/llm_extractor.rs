//! LLM-backed entity extractor.
//!
//! The model is shown the schema set and asked for a JSON object keyed by
//! entity type. Each value may be a list of instances or a single object;
//! `null` field values become explicit absent markers.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

use super::json_reply::parse_json_reply;
use crate::domain::conversation::{transcript, Turn};
use crate::domain::entities::{Extraction, PartialRecord, SchemaSet};
use crate::domain::foundation::ThreadId;
use crate::ports::{
    AIProvider, CapabilityError, CompletionRequest, EntityExtractor, MessageRole, RequestMetadata,
};

/// History turns shown to the model to avoid re-extracting repeated details.
const HISTORY_TURNS: usize = 5;

pub struct LlmEntityExtractor {
    provider: Arc<dyn AIProvider>,
    today: Option<NaiveDate>,
}

impl LlmEntityExtractor {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            today: None,
        }
    }

    /// Pins the date used to resolve "today" and "yesterday".
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn system_prompt(&self, schemas: &SchemaSet, history: &[Turn]) -> String {
        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let history_text = transcript(history, HISTORY_TURNS);

        format!(
            "You extract structured life-log data from the user's latest message.\n\
             Today is {today}. Resolve relative dates and times against it.\n\n\
             Entity types and their fields:\n{schemas}\n\n\
             Rules:\n\
             - Reply with one JSON object keyed by entity type; each value is a list of instances.\n\
             - Only include entity types the message actually mentions.\n\
             - Use null for fields the user did not state. Never guess values.\n\
             - If the message answers a question from the conversation, fill only the fields it answers.\n\
             - Reply {{}} if nothing can be extracted.\n\n\
             Recent conversation (do not re-extract details already given):\n{history}",
            today = today.format("%Y-%m-%d"),
            schemas = schemas.describe(),
            history = if history_text.is_empty() { "(none)".to_string() } else { history_text },
        )
    }

    /// Converts the model's JSON into an extraction.
    pub fn parse_extraction(value: &Value) -> Result<Extraction, CapabilityError> {
        let root = value
            .as_object()
            .ok_or_else(|| CapabilityError::invalid_response("extraction is not a JSON object"))?;
        let entities = match root.get("entities").and_then(Value::as_object) {
            Some(inner) => inner,
            None => root,
        };

        let mut extraction = Extraction::new();
        for (entity_type, instances) in entities {
            let objects: Vec<&serde_json::Map<String, Value>> = match instances {
                Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
                Value::Object(object) => vec![object],
                _ => continue,
            };
            let records: Vec<PartialRecord> = objects
                .into_iter()
                .map(PartialRecord::from_json_object)
                .filter(|r| !r.is_empty())
                .collect();
            if !records.is_empty() {
                extraction.insert(entity_type.clone(), records);
            }
        }
        Ok(extraction)
    }
}

#[async_trait]
impl EntityExtractor for LlmEntityExtractor {
    async fn extract(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
        schemas: &SchemaSet,
    ) -> Result<Extraction, CapabilityError> {
        let request = CompletionRequest::new(RequestMetadata::new("extract", thread_id.clone()))
            .with_system_prompt(self.system_prompt(schemas, history))
            .with_message(MessageRole::User, text)
            .with_temperature(0.0)
            .with_json_response();

        let response = self.provider.complete(request).await?;
        let value = parse_json_reply(&response.content)?;
        let extraction = Self::parse_extraction(&value)?;

        tracing::debug!(
            thread_id = %thread_id,
            entity_types = ?extraction.keys().collect::<Vec<_>>(),
            "Extracted entities"
        );
        Ok(extraction)
    }
}
