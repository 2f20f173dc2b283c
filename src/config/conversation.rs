//! Conversation engine configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::RouterConfig;

/// Turn handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Turns kept per conversation
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Longer messages are truncated
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Save unrecognized log messages as journal notes
    #[serde(default = "default_journal_fallback")]
    pub journal_fallback: bool,

    /// Timeout for each collaborator call in seconds
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout_secs: u64,

    /// YAML schema set replacing the built-in one
    pub schema_path: Option<PathBuf>,
}

impl ConversationConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            history_window: self.history_window,
            max_input_chars: self.max_input_chars,
            journal_fallback: self.journal_fallback,
            collaborator_timeout: self.collaborator_timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_window < 2 {
            return Err(ValidationError::InvalidHistoryWindow);
        }
        if self.max_input_chars == 0 {
            return Err(ValidationError::InvalidInputLimit);
        }
        if self.collaborator_timeout_secs == 0 || self.collaborator_timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout("collaborator_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_input_chars: default_max_input_chars(),
            journal_fallback: default_journal_fallback(),
            collaborator_timeout_secs: default_collaborator_timeout(),
            schema_path: None,
        }
    }
}

fn default_history_window() -> usize {
    20
}

fn default_max_input_chars() -> usize {
    2000
}

fn default_journal_fallback() -> bool {
    true
}

fn default_collaborator_timeout() -> u64 {
    30
}
