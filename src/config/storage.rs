//! Conversation storage configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Where conversation records live between runs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for per-thread YAML files; in-memory when unset
    pub conversation_dir: Option<PathBuf>,
}
