//! # vaultbackup-core
//!
//! Triggers an on-demand backup of an Azure Data Protection backup instance
//! and follows the resulting long-running operation to completion.
//!
//! The flow is an explicit pipeline:
//!
//! ```text
//! authenticate() -> trigger_backup() -> { Completed | poll_operation() }
//! ```
//!
//! All HTTP goes through [`HttpExchange`], so the protocol can be exercised
//! with a scripted exchanger. Token acquisition sits behind [`TokenProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vaultbackup_core::{
//!     BackupConfig, CredentialSource, PollOptions, ReqwestExchange, run_backup,
//! };
//!
//! let config = BackupConfig::from_env()?;
//! let exchange = Arc::new(ReqwestExchange::new()?);
//! let credential = CredentialSource::from_env().into_provider(exchange.clone());
//!
//! let outcome = run_backup(
//!     exchange.as_ref(),
//!     credential.as_ref(),
//!     &config,
//!     &PollOptions::default(),
//!     &CancellationToken::new(),
//!     None,
//! )
//! .await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod progress;
pub mod request;
pub mod transport;
pub mod trigger;
pub mod workflow;

pub use auth::{AccessToken, AuthError, CredentialSource, StaticToken, TokenProvider};
pub use config::{BackupConfig, ConfigError};
pub use error::{CoreError, Result};
pub use progress::{
    OperationStatus, PollOptions, PollOutcome, ProgressCallback, ProgressEvent, TerminalStatus,
    extract_status, poll_operation,
};
pub use request::BackupRequest;
pub use transport::{ApiRequest, ApiResponse, HttpExchange, HttpMethod, ReqwestExchange, TransportError};
pub use trigger::{AsyncHeader, AsyncOperation, TriggerOutcome, trigger_backup};
pub use workflow::{BackupOutcome, authenticate, run_backup};
