//! Error types for configuration resolution

use thiserror::Error;

/// Errors that can occur while resolving configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {key}")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    /// Name of the environment variable the error refers to
    pub fn key(&self) -> &'static str {
        match self {
            ConfigError::Missing { key } | ConfigError::Invalid { key, .. } => key,
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
