//! Backup workflow: authenticate, trigger, then poll to a terminal status
//!
//! This composes the individual steps and returns what happened as a value.
//! Nothing here prints; callers render progress through the callback.

use crate::auth::{AccessToken, MANAGEMENT_SCOPE, TokenProvider};
use crate::config::BackupConfig;
use crate::error::{CoreError, Result};
use crate::progress::{PollOptions, PollOutcome, ProgressCallback, TerminalStatus, poll_operation};
use crate::request::BackupRequest;
use crate::transport::HttpExchange;
use crate::trigger::{TriggerOutcome, trigger_backup};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a backup run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The trigger response had no async operation to follow
    Completed { trigger_status: u16 },
    /// The operation reported `Succeeded`
    Succeeded {
        trigger_status: u16,
        poll: PollOutcome,
    },
    /// The operation reported `Failed`
    Failed {
        trigger_status: u16,
        poll: PollOutcome,
    },
}

impl BackupOutcome {
    /// True only when the remote operation itself reported failure
    pub fn is_reported_failure(&self) -> bool {
        matches!(self, BackupOutcome::Failed { .. })
    }

    pub fn trigger_status(&self) -> u16 {
        match self {
            BackupOutcome::Completed { trigger_status }
            | BackupOutcome::Succeeded { trigger_status, .. }
            | BackupOutcome::Failed { trigger_status, .. } => *trigger_status,
        }
    }
}

/// Acquire a Resource Manager token
pub async fn authenticate(credential: &dyn TokenProvider) -> Result<AccessToken> {
    debug!(credential = credential.name(), "Acquiring management token");
    let token = credential.get_token(MANAGEMENT_SCOPE).await?;
    debug!(expires_in = ?token.expires_in, "Token acquired");
    Ok(token)
}

/// Trigger an on-demand backup and wait for its operation to finish
///
/// The token is acquired once and reused for every poll. `cancel` is honoured
/// at every step; a token cancelled up front sends no request at all.
pub async fn run_backup(
    exchange: &dyn HttpExchange,
    credential: &dyn TokenProvider,
    config: &BackupConfig,
    options: &PollOptions,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> Result<BackupOutcome> {
    let request = BackupRequest::new(config);
    let token = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CoreError::Cancelled),
        token = authenticate(credential) => token?,
    };

    // Nothing is sent once cancelled; an in-flight POST may still land
    let triggered = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CoreError::Cancelled),
        outcome = trigger_backup(exchange, &request, token.secret(), on_progress) => outcome?,
    };

    let (trigger_status, operation) = match triggered {
        TriggerOutcome::Completed { status } => {
            return Ok(BackupOutcome::Completed {
                trigger_status: status,
            });
        }
        TriggerOutcome::Accepted { status, operation } => (status, operation),
    };

    let poll = poll_operation(
        exchange,
        &operation,
        token.secret(),
        options,
        cancel,
        on_progress,
    )
    .await?;

    Ok(match poll.status {
        TerminalStatus::Succeeded => BackupOutcome::Succeeded {
            trigger_status,
            poll,
        },
        TerminalStatus::Failed => BackupOutcome::Failed {
            trigger_status,
            poll,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn poll(status: TerminalStatus) -> PollOutcome {
        PollOutcome {
            status,
            body: String::new(),
            attempts: 1,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_outcome_helpers() {
        let completed = BackupOutcome::Completed { trigger_status: 200 };
        assert!(!completed.is_reported_failure());
        assert_eq!(completed.trigger_status(), 200);

        let failed = BackupOutcome::Failed {
            trigger_status: 202,
            poll: poll(TerminalStatus::Failed),
        };
        assert!(failed.is_reported_failure());
        assert_eq!(failed.trigger_status(), 202);

        let succeeded = BackupOutcome::Succeeded {
            trigger_status: 202,
            poll: poll(TerminalStatus::Succeeded),
        };
        assert!(!succeeded.is_reported_failure());
    }
}
