//! Error types for vaultbackup
//!
//! Core errors are mapped into [`CliError`], which knows how to explain
//! itself to an operator.

use colored::Colorize;
use thiserror::Error;
use vaultbackup_core::{AuthError, ConfigError, CoreError, TransportError};

use crate::cli::flag_for_key;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Missing required setting VAULT_NAME
///
///   tip: set VAULT_NAME in the environment or pass --vault-name
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<String>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for description in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
        }
    }
}

/// Main error type for the vaultbackup binary
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Missing required setting {key}")]
    MissingSetting { key: &'static str },

    #[error("Invalid value for {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Invalid operation status: {message}")]
    InvalidStatusResponse { message: String },

    #[error("Cancelled while waiting for the backup operation")]
    Cancelled,
}

/// Result type for vaultbackup operations
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::MissingSetting { key } | CliError::InvalidSetting { key, .. } => {
                match flag_for_key(key) {
                    Some(flag) => vec![format!(
                        "set {} in the environment or pass {}",
                        key, flag
                    )],
                    None => vec![format!("set {} in the environment", key)],
                }
            }
            CliError::AuthenticationFailed { .. } => vec![
                "For a service principal: check AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET".to_string(),
                "For AKS workload identity: check the service account annotation and AZURE_FEDERATED_TOKEN_FILE".to_string(),
                "For managed identity: make sure the identity is assigned and has the Backup Operator role on the vault".to_string(),
            ],
            CliError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify AZURE_RESOURCE_MANAGER_ENDPOINT if you overrode it".to_string(),
            ],
            CliError::Timeout { .. } => vec![
                "The backup may still be running; check the vault's backup jobs in the portal".to_string(),
                "Increase --wait-timeout or omit it to wait until the operation finishes".to_string(),
            ],
            CliError::InvalidStatusResponse { .. } => vec![
                "The backup may still be running; check the vault's backup jobs in the portal".to_string(),
                "Raise --max-malformed-responses to tolerate more transient gateway errors".to_string(),
            ],
            CliError::Cancelled => vec![
                "The backup was triggered and may still complete on the service side".to_string(),
            ],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        if matches!(self, CliError::Timeout { .. } | CliError::InvalidStatusResponse { .. }) {
            diag = diag.detail("Polling stopped before the operation reached a terminal status.");
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { key } => CliError::MissingSetting { key },
            ConfigError::Invalid { key, message } => CliError::InvalidSetting { key, message },
        }
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },
            TransportError::Request { .. } => CliError::ConnectionError {
                message: err.to_string(),
            },
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Transport(transport) => CliError::from(transport),
            _ => CliError::AuthenticationFailed {
                message: err.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(config) => CliError::from(config),
            CoreError::Auth(auth) => CliError::from(auth),
            CoreError::Transport(transport) => CliError::from(transport),
            CoreError::MalformedPollResponse { .. } => CliError::InvalidStatusResponse {
                message: err.to_string(),
            },
            CoreError::PollTimeout(duration) => CliError::Timeout {
                message: format!(
                    "Operation did not finish within {} seconds",
                    duration.as_secs()
                ),
            },
            CoreError::Cancelled => CliError::Cancelled,
        }
    }
}
