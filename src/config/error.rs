//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("History window must be at least 2 turns")]
    InvalidHistoryWindow,

    #[error("Maximum input length must be positive")]
    InvalidInputLimit,

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Temperature must be between 0 and 2")]
    InvalidTemperature,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 100")]
    InvalidPoolSize,

    #[error("Sync max_attempts must be between 1 and 10")]
    InvalidSyncAttempts,

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}
