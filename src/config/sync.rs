//! Document sync configuration (Notion)

use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashMap;

use super::error::ValidationError;
use crate::adapters::sync::NotionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,

    pub notion_api_key: Option<Secret<String>>,

    /// Entity type -> Notion page id
    #[serde(default)]
    pub pages: HashMap<String, String>,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl SyncConfig {
    /// Notion configuration when sync is enabled and a key is present
    pub fn notion(&self) -> Option<NotionConfig> {
        if !self.enabled {
            return None;
        }
        let key = self.notion_api_key.clone()?;
        Some(NotionConfig::new(key, self.pages.clone()).with_max_attempts(self.max_attempts))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.notion_api_key.is_none() {
            return Err(ValidationError::MissingRequired("NOTION_API_KEY"));
        }
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ValidationError::InvalidSyncAttempts);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            notion_api_key: None,
            pages: HashMap::new(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
