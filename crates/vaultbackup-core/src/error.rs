//! Unified error handling for vaultbackup-core
//!
//! A backup whose remote operation reports `Failed` is not an error; it is
//! returned as an outcome. Errors here mean this process could not finish
//! driving the operation.

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or invalid configuration, raised before any network call
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token acquisition failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Connection failure or call timeout
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Operation status body kept failing to parse as JSON
    #[error("Invalid operation status from {url} after {attempts} attempts: {message}")]
    MalformedPollResponse {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Caller-imposed polling deadline elapsed
    #[error("Operation did not finish within {0:?}")]
    PollTimeout(Duration),

    /// Polling was cancelled through its token
    #[error("Operation polling was cancelled")]
    Cancelled,
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if this is a timeout, either per call or overall
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CoreError::PollTimeout(_) | CoreError::Transport(TransportError::Timeout { .. })
        )
    }

    /// Returns true if this error happened before the backup was triggered
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::Config(_))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}
