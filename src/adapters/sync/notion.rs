//! Notion document sync.
//!
//! Appends one block per finalized entity to the page configured for its
//! entity type. Tasks become to-do items, reading links become linked
//! paragraphs, everything else a bulleted list item.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::entities::SchemaSet;
use crate::domain::extraction::{FinalizeBatch, FinalizedEntity};
use crate::domain::response::entity_summary;
use crate::ports::{DocumentSync, SyncError};

const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects longer `text.content` values.
const MAX_TEXT_CHARS: usize = 2000;

/// Configuration for [`NotionDocumentSync`].
#[derive(Debug, Clone)]
pub struct NotionConfig {
    api_key: Secret<String>,
    /// Entity type -> Notion page (block) id.
    pub pages: HashMap<String, String>,
    pub base_url: String,
    /// Attempts per page append, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl NotionConfig {
    pub fn new(api_key: Secret<String>, pages: HashMap<String, String>) -> Self {
        Self {
            api_key,
            pages,
            base_url: "https://api.notion.com/v1".to_string(),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

pub struct NotionDocumentSync {
    config: NotionConfig,
    schemas: Arc<SchemaSet>,
    client: Client,
}

impl NotionDocumentSync {
    pub fn new(config: NotionConfig, schemas: Arc<SchemaSet>) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            config,
            schemas,
            client,
        })
    }

    fn children_url(&self, page_id: &str) -> String {
        format!(
            "{}/blocks/{}/children",
            self.config.base_url.trim_end_matches('/'),
            page_id
        )
    }

    /// Groups the batch's blocks by entity type, dropping unconfigured types.
    fn plan(&self, batch: &FinalizeBatch) -> BTreeMap<String, (String, Vec<Value>)> {
        let mut plan: BTreeMap<String, (String, Vec<Value>)> = BTreeMap::new();
        for entity in &batch.entities {
            let Some(page_id) = self.config.pages.get(&entity.entity_type) else {
                tracing::debug!(entity_type = %entity.entity_type, "No Notion page configured");
                continue;
            };
            let block = self.block_for(entity, batch);
            plan.entry(entity.entity_type.clone())
                .or_insert_with(|| (page_id.clone(), Vec::new()))
                .1
                .push(block);
        }
        plan
    }

    fn block_for(&self, entity: &FinalizedEntity, batch: &FinalizeBatch) -> Value {
        let summary = match self.schemas.get(&entity.entity_type) {
            Some(schema) => entity_summary(schema, &entity.fields),
            None => entity.entity_type.clone(),
        };
        let text = format!("{} | {}", batch.finalized_at.date(), summary);

        match entity.entity_type.as_str() {
            "task" => json!({
                "object": "block",
                "type": "to_do",
                "to_do": { "rich_text": rich_text(&text, None), "checked": false }
            }),
            "reading_link" => {
                let url = entity.fields.value("url").and_then(Value::as_str);
                json!({
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": { "rich_text": rich_text(&text, url) }
                })
            }
            _ => json!({
                "object": "block",
                "type": "bulleted_list_item",
                "bulleted_list_item": { "rich_text": rich_text(&text, None) }
            }),
        }
    }

    async fn append(&self, page_id: &str, children: &[Value]) -> Result<(), String> {
        let response = self
            .client
            .patch(self.children_url(page_id))
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({ "children": children }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(format!("status {}: {}", status, body))
        }
    }

    async fn append_with_retry(&self, entity_type: &str, page_id: &str, children: &[Value]) -> bool {
        let mut attempt = 1;
        loop {
            match self.append(page_id, children).await {
                Ok(()) => {
                    tracing::info!(entity_type, count = children.len(), "Appended Notion blocks");
                    return true;
                }
                Err(error) if attempt < self.config.max_attempts => {
                    let delay = self.config.initial_backoff * (1 << (attempt - 1));
                    tracing::warn!(entity_type, attempt, error = %error, "Retrying Notion append");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(entity_type, attempts = attempt, error = %error, "Notion append failed");
                    return false;
                }
            }
        }
    }
}

/// Rich-text segments for `content`, split so no segment exceeds Notion's
/// per-segment limit.
fn rich_text(content: &str, link: Option<&str>) -> Vec<Value> {
    let chars: Vec<char> = content.chars().collect();
    let chunks: Vec<String> = if chars.is_empty() {
        vec![String::new()]
    } else {
        chars
            .chunks(MAX_TEXT_CHARS)
            .map(|c| c.iter().collect())
            .collect()
    };
    chunks
        .into_iter()
        .map(|chunk| match link {
            Some(url) => json!({ "type": "text", "text": { "content": chunk, "link": { "url": url } } }),
            None => json!({ "type": "text", "text": { "content": chunk } }),
        })
        .collect()
}

#[async_trait]
impl DocumentSync for NotionDocumentSync {
    async fn sync(&self, batch: &FinalizeBatch) -> Result<(), SyncError> {
        let mut failed = Vec::new();
        for (entity_type, (page_id, children)) in self.plan(batch) {
            if !self.append_with_retry(&entity_type, &page_id, &children).await {
                failed.push(entity_type);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Partial { failed })
        }
    }
}

/// Sync adapter used when document sync is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDocumentSync;

#[async_trait]
impl DocumentSync for NoopDocumentSync {
    async fn sync(&self, _batch: &FinalizeBatch) -> Result<(), SyncError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PartialRecord;
    use crate::domain::foundation::{BatchId, ThreadId, Timestamp};

    fn sync_with(pages: &[(&str, &str)], base_url: &str) -> NotionDocumentSync {
        let pages = pages
            .iter()
            .map(|(t, p)| (t.to_string(), p.to_string()))
            .collect();
        let config = NotionConfig::new(Secret::new("secret".to_string()), pages)
            .with_base_url(base_url)
            .with_max_attempts(2)
            .with_initial_backoff(Duration::from_millis(1));
        NotionDocumentSync::new(config, Arc::new(SchemaSet::builtin().unwrap())).unwrap()
    }

    fn batch() -> FinalizeBatch {
        FinalizeBatch {
            batch_id: BatchId::new(),
            thread_id: ThreadId::new("chat-1").unwrap(),
            entities: vec![
                FinalizedEntity {
                    entity_type: "task".into(),
                    fields: PartialRecord::new().with("task", "call the dentist"),
                },
                FinalizedEntity {
                    entity_type: "reading_link".into(),
                    fields: PartialRecord::new().with("url", "https://example.com/post"),
                },
                FinalizedEntity {
                    entity_type: "meditation".into(),
                    fields: PartialRecord::new().with("minutes", 20),
                },
            ],
            finalized_at: Timestamp::now(),
        }
    }

    #[test]
    fn unconfigured_types_are_skipped() {
        let sync = sync_with(&[("task", "page-1")], "http://localhost:9");
        let plan = sync.plan(&batch());
        assert_eq!(plan.len(), 1);
        let (page, blocks) = &plan["task"];
        assert_eq!(page, "page-1");
        assert_eq!(blocks[0]["type"], "to_do");
    }

    #[test]
    fn reading_links_carry_the_url() {
        let sync = sync_with(&[("reading_link", "page-2")], "http://localhost:9");
        let plan = sync.plan(&batch());
        let block = &plan["reading_link"].1[0];
        assert_eq!(block["type"], "paragraph");
        assert_eq!(
            block["paragraph"]["rich_text"][0]["text"]["link"]["url"],
            "https://example.com/post"
        );
    }

    #[test]
    fn long_journal_note_is_split_into_segments() {
        let sync = sync_with(&[("journal", "page-3")], "http://localhost:9");
        let note = "é".repeat(4000);
        let batch = FinalizeBatch {
            entities: vec![FinalizedEntity {
                entity_type: "journal".into(),
                fields: PartialRecord::new().with("note", note.as_str()),
            }],
            ..batch()
        };

        let plan = sync.plan(&batch);
        let segments = plan["journal"].1[0]["bulleted_list_item"]["rich_text"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(segments.len(), 3);
        let lengths: Vec<usize> = segments
            .iter()
            .map(|s| s["text"]["content"].as_str().unwrap().chars().count())
            .collect();
        assert!(lengths.iter().all(|&n| n <= MAX_TEXT_CHARS));
        let joined: String = segments
            .iter()
            .map(|s| s["text"]["content"].as_str().unwrap())
            .collect();
        assert!(joined.ends_with(&note));
    }

    #[test]
    fn short_text_is_one_segment() {
        assert_eq!(rich_text("hello", None).len(), 1);
        assert_eq!(rich_text("", None)[0]["text"]["content"], "");
    }

    #[test]
    fn children_url_is_built_from_base() {
        let sync = sync_with(&[], "https://api.notion.com/v1/");
        assert_eq!(
            sync.children_url("abc"),
            "https://api.notion.com/v1/blocks/abc/children"
        );
    }

    #[tokio::test]
    async fn unreachable_api_reports_failed_types() {
        // Nothing listens on port 9.
        let sync = sync_with(&[("task", "p1"), ("meditation", "p2")], "http://127.0.0.1:9");
        let err = sync.sync(&batch()).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Partial {
                failed: vec!["meditation".to_string(), "task".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn noop_sync_is_disabled() {
        let sync = NoopDocumentSync;
        assert!(!sync.is_enabled());
        assert!(sync.sync(&batch()).await.is_ok());
    }
}
