//! LLM-backed intent classifier.

use async_trait::async_trait;
use std::sync::Arc;

use super::json_reply::parse_json_reply;
use crate::domain::conversation::{Intent, Speaker, Turn};
use crate::domain::foundation::ThreadId;
use crate::ports::{
    AIProvider, CapabilityError, CompletionRequest, IntentClassifier, MessageRole, RequestMetadata,
};

const SYSTEM_PROMPT: &str = "Classify the user's message into one of three intents:\n\
- 'log': the user shares anything about their day, health, mood, activities, plans, \
journal entries, tasks, links, or anything they did, felt, or plan to do. \
Answers to a question you just asked them are also 'log'. When in doubt, choose 'log'.\n\
- 'query': the user asks a question about their past tracked data, \
e.g. 'how did I sleep this week?', 'show me my exercise log'.\n\
- 'other': truly unrelated, e.g. maths help, news, random facts.\n\
Reply with JSON only: {\"intent\": \"log\" | \"query\" | \"other\"}";

/// Number of history turns given to the classifier.
const CONTEXT_TURNS: usize = 4;

pub struct LlmIntentClassifier {
    provider: Arc<dyn AIProvider>,
}

impl LlmIntentClassifier {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self { provider }
    }

    fn parse(reply: &str) -> Intent {
        match parse_json_reply(reply) {
            Ok(value) => value
                .get("intent")
                .and_then(|v| v.as_str())
                .map(Intent::from_label)
                .unwrap_or(Intent::Other),
            Err(_) => Intent::from_label(reply.trim().trim_matches('"')),
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        thread_id: &ThreadId,
        text: &str,
        history: &[Turn],
    ) -> Result<Intent, CapabilityError> {
        let mut request = CompletionRequest::new(RequestMetadata::new("classify", thread_id.clone()))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(0.0)
            .with_max_tokens(20)
            .with_json_response();

        let start = history.len().saturating_sub(CONTEXT_TURNS);
        for turn in &history[start..] {
            let role = match turn.speaker {
                Speaker::User => MessageRole::User,
                Speaker::Assistant => MessageRole::Assistant,
            };
            request = request.with_message(role, turn.text.clone());
        }
        request = request.with_message(MessageRole::User, text);

        let response = self.provider.complete(request).await?;
        let intent = Self::parse(&response.content);
        tracing::debug!(thread_id = %thread_id, intent = %intent, "Classified message");
        Ok(intent)
    }
}
