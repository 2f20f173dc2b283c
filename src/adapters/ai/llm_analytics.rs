//! LLM-backed analytics over the thread's stored records.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::ThreadId;
use crate::ports::{
    AIProvider, Analytics, CapabilityError, CompletionRequest, MessageRole, RecordReader,
    RequestMetadata, StoredRecord,
};

pub const NO_DATA_ANSWER: &str = "I don't have any data logged for you yet!";

/// Records per entity type shown to the model.
const RECORDS_PER_TYPE: u32 = 30;

pub struct LlmAnalytics {
    provider: Arc<dyn AIProvider>,
    reader: Arc<dyn RecordReader>,
}

impl LlmAnalytics {
    pub fn new(provider: Arc<dyn AIProvider>, reader: Arc<dyn RecordReader>) -> Self {
        Self { provider, reader }
    }

    async fn data_tables(&self, thread_id: &ThreadId) -> Result<Vec<String>, CapabilityError> {
        let unavailable = |e: crate::ports::RecordStoreError| CapabilityError::unavailable(e.to_string());
        let mut tables = Vec::new();
        for entity_type in self.reader.entity_types(thread_id).await.map_err(unavailable)? {
            let records = self
                .reader
                .recent(thread_id, &entity_type, RECORDS_PER_TYPE)
                .await
                .map_err(unavailable)?;
            if !records.is_empty() {
                tables.push(markdown_table(&entity_type, &records));
            }
        }
        Ok(tables)
    }
}

/// Renders records as a markdown table with a `date` column first.
pub fn markdown_table(entity_type: &str, records: &[StoredRecord]) -> String {
    let columns: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.data.as_object())
        .flat_map(|o| o.keys().map(String::as_str))
        .collect();

    let mut out = format!(
        "## {} (last {} entries)\n| date | {} |\n|---|{}\n",
        entity_type.to_uppercase(),
        records.len(),
        columns.iter().copied().collect::<Vec<_>>().join(" | "),
        "---|".repeat(columns.len()),
    );
    for record in records {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match record.data.get(*c) {
                Some(Value::String(s)) => s.replace('|', "/"),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        out.push_str(&format!("| {} | {} |\n", record.date, cells.join(" | ")));
    }
    out
}

#[async_trait]
impl Analytics for LlmAnalytics {
    async fn answer(&self, thread_id: &ThreadId, question: &str) -> Result<String, CapabilityError> {
        let tables = self.data_tables(thread_id).await?;
        if tables.is_empty() {
            return Ok(NO_DATA_ANSWER.to_string());
        }

        let system_prompt = format!(
            "You are a helpful life-log assistant. Answer the user's question based ONLY on \
             the following data logs in markdown format. Be concise and friendly. If the data \
             does not contain the answer, say so.\n\nData Logs:\n{}",
            tables.join("\n")
        );
        let request = CompletionRequest::new(RequestMetadata::new("query", thread_id.clone()))
            .with_system_prompt(system_prompt)
            .with_message(MessageRole::User, question)
            .with_temperature(0.2);

        let response = self.provider.complete(request).await?;
        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(CapabilityError::invalid_response("empty analytics answer"));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::records::InMemoryRecordStore;
    use crate::domain::entities::PartialRecord;
    use crate::domain::extraction::{FinalizeBatch, FinalizedEntity};
    use crate::domain::foundation::{BatchId, Timestamp};
    use crate::ports::RecordSink;
    use serde_json::json;

    fn thread() -> ThreadId {
        ThreadId::new("t").unwrap()
    }

    #[tokio::test]
    async fn no_records_answers_without_model() {
        let provider = Arc::new(MockAIProvider::new());
        let analytics = LlmAnalytics::new(provider.clone(), Arc::new(InMemoryRecordStore::new()));

        let answer = analytics.answer(&thread(), "how did I sleep?").await.unwrap();
        assert_eq!(answer, NO_DATA_ANSWER);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn records_are_given_to_model_as_tables() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .persist(&FinalizeBatch {
                batch_id: BatchId::new(),
                thread_id: thread(),
                entities: vec![FinalizedEntity {
                    entity_type: "sleep".into(),
                    fields: PartialRecord::new().with("duration_hours", 7.5).with("quality", "good"),
                }],
                finalized_at: Timestamp::now(),
            })
            .await
            .unwrap();
        let provider = Arc::new(MockAIProvider::new().with_response("You slept 7.5 hours."));
        let analytics = LlmAnalytics::new(provider.clone(), store);

        let answer = analytics.answer(&thread(), "how did I sleep?").await.unwrap();
        assert_eq!(answer, "You slept 7.5 hours.");

        let prompt = provider.get_calls()[0].system_prompt.clone().unwrap();
        assert!(prompt.contains("## SLEEP (last 1 entries)"));
        assert!(prompt.contains("| date | duration_hours | quality |"));
        assert!(prompt.contains("| 7.5 | good |"));
    }

    #[test]
    fn table_has_union_of_columns() {
        let record = |data: Value| StoredRecord {
            batch_id: BatchId::new(),
            position: 0,
            thread_id: thread(),
            entity_type: "exercise".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            data,
            created_at: Timestamp::now(),
        };
        let table = markdown_table(
            "exercise",
            &[record(json!({"a": 1})), record(json!({"b": "x|y"}))],
        );
        assert!(table.contains("| date | a | b |"));
        assert!(table.contains("| 2024-05-01 | 1 |  |"));
        assert!(table.contains("| 2024-05-01 |  | x/y |"));
    }
}
