//! Line-oriented front end: each stdin line is `thread: message`.
//! `/last thread` re-prints the last reply for a thread.

use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use lifelog::adapters::{
    FileConversationStorage, InMemoryConversationStorage, LlmAnalytics, LlmChatResponder,
    LlmEntityExtractor, LlmIntentClassifier, NoopDocumentSync, NotionDocumentSync, OpenAIProvider,
    PatternSafetyGuard, SqliteRecordStore,
};
use lifelog::application::{Collaborators, SessionStore, TurnRouter};
use lifelog::config::{init_tracing, AppConfig, ConfigError, ValidationError};
use lifelog::domain::entities::SchemaSet;
use lifelog::ports::{AIProvider, ConversationStorage, DocumentSync};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;
    config.validate().map_err(ConfigError::from)?;

    let router = build_router(&config).await?;
    tracing::info!(
        schemas = router.schemas().len(),
        "Ready. Enter `thread: message` lines"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(thread) = line.strip_prefix("/last ") {
            match router.last_response(thread.trim()).await {
                Some(reply) => println!("{}", reply),
                None => println!("(nothing yet)"),
            }
            continue;
        }
        match line.split_once(':') {
            Some((thread, text)) => println!("{}", router.handle_turn(thread.trim(), text).await),
            None => eprintln!("expected `thread: message`"),
        }
    }
    Ok(())
}

async fn build_router(config: &AppConfig) -> Result<TurnRouter, Box<dyn Error>> {
    let schemas = Arc::new(match &config.conversation.schema_path {
        Some(path) => SchemaSet::from_yaml(&tokio::fs::read_to_string(path).await?)?,
        None => SchemaSet::builtin()?,
    });

    let openai = config
        .ai
        .openai()
        .ok_or(ConfigError::from(ValidationError::MissingRequired("OPENAI_API_KEY")))?;
    let provider: Arc<dyn AIProvider> = Arc::new(OpenAIProvider::new(openai)?);

    let records = Arc::new(
        SqliteRecordStore::connect(&config.database.url, config.database.max_connections).await?,
    );

    let sync: Arc<dyn DocumentSync> = match config.sync.notion() {
        Some(notion) => Arc::new(NotionDocumentSync::new(notion, Arc::clone(&schemas))?),
        None => Arc::new(NoopDocumentSync),
    };

    let storage: Arc<dyn ConversationStorage> = match &config.storage.conversation_dir {
        Some(dir) => Arc::new(FileConversationStorage::new(dir)),
        None => Arc::new(InMemoryConversationStorage::new()),
    };

    let collaborators = Collaborators {
        safety: Arc::new(PatternSafetyGuard::new()?),
        classifier: Arc::new(LlmIntentClassifier::new(Arc::clone(&provider))),
        extractor: Arc::new(LlmEntityExtractor::new(Arc::clone(&provider))),
        sink: records.clone(),
        sync,
        analytics: Arc::new(LlmAnalytics::new(Arc::clone(&provider), records)),
        chat: Arc::new(LlmChatResponder::new(provider)),
    };

    Ok(TurnRouter::new(
        SessionStore::new(storage),
        schemas,
        collaborators,
        config.conversation.router_config(),
    ))
}
