//! Chat responders for messages that are neither logs nor queries.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::conversation::Turn;
use crate::domain::foundation::ThreadId;
use crate::ports::{
    AIProvider, CapabilityError, ChatResponder, CompletionRequest, MessageRole, RequestMetadata,
};

const SYSTEM_PROMPT: &str = "You are a warm personal life-log assistant. \
Reply in one or two short sentences. Acknowledge what the user said and, \
where it fits, offer to log their sleep, exercise, mood, meditation, tasks or notes. \
Do not answer unrelated factual questions at length.";

/// LLM-sourced acknowledgement.
pub struct LlmChatResponder {
    provider: Arc<dyn AIProvider>,
}

impl LlmChatResponder {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatResponder for LlmChatResponder {
    async fn reply(
        &self,
        thread_id: &ThreadId,
        text: &str,
        _history: &[Turn],
    ) -> Result<String, CapabilityError> {
        let request = CompletionRequest::new(RequestMetadata::new("chitchat", thread_id.clone()))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_message(MessageRole::User, text)
            .with_temperature(0.5)
            .with_max_tokens(120);

        let response = self.provider.complete(request).await?;
        let reply = response.content.trim();
        if reply.is_empty() {
            return Err(CapabilityError::invalid_response("empty chat reply"));
        }
        Ok(reply.to_string())
    }
}

/// Fixed acknowledgement, used when no model is configured.
pub struct ScriptedChatResponder {
    text: String,
}

impl ScriptedChatResponder {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for ScriptedChatResponder {
    fn default() -> Self {
        Self::new("Got it! Let me know whenever you want to log sleep, exercise, mood or a task.")
    }
}

#[async_trait]
impl ChatResponder for ScriptedChatResponder {
    async fn reply(&self, _: &ThreadId, _: &str, _: &[Turn]) -> Result<String, CapabilityError> {
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;

    fn thread() -> ThreadId {
        ThreadId::new("t").unwrap()
    }

    #[tokio::test]
    async fn llm_reply_is_trimmed_and_warm() {
        let provider = Arc::new(MockAIProvider::new().with_response("  Hello there!  "));
        let responder = LlmChatResponder::new(provider.clone());

        assert_eq!(responder.reply(&thread(), "hi", &[]).await.unwrap(), "Hello there!");
        assert_eq!(provider.get_calls()[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let provider = Arc::new(MockAIProvider::new().with_response("   "));
        let responder = LlmChatResponder::new(provider);
        assert!(responder.reply(&thread(), "hi", &[]).await.is_err());
    }

    #[tokio::test]
    async fn scripted_reply_is_fixed() {
        let responder = ScriptedChatResponder::new("ok");
        assert_eq!(responder.reply(&thread(), "anything", &[]).await.unwrap(), "ok");
    }
}
