//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `LIFELOG` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use lifelog::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod conversation;
mod database;
mod error;
mod logging;
mod storage;
mod sync;

pub use ai::{AiConfig, SUPPORTED_MODELS};
pub use conversation::ConversationConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{init_tracing, LogFormat, LoggingConfig};
pub use storage::StorageConfig;
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults except the OpenAI key, which `validate`
/// requires. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Turn handling (history window, input limit, fallbacks, timeouts)
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// AI provider configuration (OpenAI)
    #[serde(default)]
    pub ai: AiConfig,

    /// Record store (SQLite)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Document sync (Notion)
    #[serde(default)]
    pub sync: SyncConfig,

    /// Conversation record storage
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LIFELOG` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LIFELOG__AI__OPENAI_API_KEY=sk-...` -> `ai.openai_api_key`
    /// - `LIFELOG__SYNC__PAGES__TASK=<page id>` -> `sync.pages["task"]`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LIFELOG")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.conversation.validate()?;
        self.ai.validate()?;
        self.database.validate()?;
        self.sync.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
