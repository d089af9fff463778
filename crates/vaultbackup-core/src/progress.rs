//! Progress tracking and polling for async Resource Manager operations
//!
//! A triggered backup returns an operation URL which must be polled until the
//! reported status is `Succeeded` or `Failed`. Every other status, including a
//! missing one, means the operation is still running. Polling stops early only
//! through the caller's [`CancellationToken`] or an optional deadline.

use crate::error::{CoreError, Result};
use crate::transport::{ApiRequest, HttpExchange};
use crate::trigger::{AsyncHeader, AsyncOperation};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed delay between status requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive unparsable status bodies tolerated before giving up
pub const DEFAULT_MAX_MALFORMED_RESPONSES: u32 = 3;

const MAX_MALFORMED_BACKOFF: Duration = Duration::from_secs(60);

/// Progress events emitted while driving a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// About to send the trigger request
    Triggering { url: String, body: String },
    /// Trigger response received
    Triggered {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    /// Trigger response carried no operation URL
    NoAsyncOperation,
    /// Polling has begun
    PollStarted { url: String, source: AsyncHeader },
    /// One status request completed
    Polling {
        attempt: u32,
        reported: Option<String>,
        elapsed: Duration,
    },
    /// A status body could not be parsed and will be retried
    MalformedResponse {
        attempt: u32,
        error: String,
        retry_in: Duration,
    },
    /// Operation reported success
    Succeeded { attempts: u32, body: String },
    /// Operation reported failure
    Failed { attempts: u32, body: String },
}

/// Callback type for progress updates
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

/// Tuning for [`poll_operation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status requests
    pub interval: Duration,
    /// Overall deadline; `None` polls until a terminal status
    pub timeout: Option<Duration>,
    /// Consecutive unparsable bodies tolerated; `0` makes the first fatal
    pub max_malformed_responses: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            max_malformed_responses: DEFAULT_MAX_MALFORMED_RESPONSES,
        }
    }
}

/// Status of a polled operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    Failed,
    /// Any other value, or no status at all
    Running(Option<String>),
}

impl OperationStatus {
    /// Classify a reported status string, ignoring case
    pub fn from_reported(reported: Option<&str>) -> Self {
        match reported {
            Some(s) if s.eq_ignore_ascii_case("succeeded") => OperationStatus::Succeeded,
            Some(s) if s.eq_ignore_ascii_case("failed") => OperationStatus::Failed,
            other => OperationStatus::Running(other.map(str::to_string)),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Succeeded => f.write_str("Succeeded"),
            OperationStatus::Failed => f.write_str("Failed"),
            OperationStatus::Running(Some(s)) => f.write_str(s),
            OperationStatus::Running(None) => f.write_str("unknown"),
        }
    }
}

/// Final status of a polled operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded,
    Failed,
}

/// Result of polling an operation to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: TerminalStatus,
    /// Body of the last status response
    pub body: String,
    /// Number of GET requests issued
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Read the reported status from an operation body.
///
/// Looks at `status` first, then `properties.status`. An empty body or a
/// document without either field yields `Ok(None)`; a non-empty body that is
/// not JSON is an error.
pub fn extract_status(body: &str) -> std::result::Result<Option<String>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body)?;
    Ok(status_text(value.get("status"))
        .or_else(|| status_text(value.get("properties").and_then(|p| p.get("status")))))
}

fn status_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Poll an async operation until it reports a terminal status
///
/// # Arguments
///
/// * `exchange` - Transport used for the status requests
/// * `operation` - Operation handle returned by the trigger
/// * `token` - Bearer token attached to every request
/// * `options` - Interval, deadline and malformed-body tolerance
/// * `cancel` - Checked before each request and raced against requests and sleeps
/// * `on_progress` - Optional callback for progress updates
///
/// # Returns
///
/// The terminal status with the last response body. A reported `Failed` is
/// returned as `Ok`; errors mean polling itself could not continue.
pub async fn poll_operation(
    exchange: &dyn HttpExchange,
    operation: &AsyncOperation,
    token: &str,
    options: &PollOptions,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> Result<PollOutcome> {
    let start = Instant::now();
    let mut attempts: u32 = 0;
    let mut malformed: u32 = 0;
    let deadline = options.timeout.map(|timeout| (start + timeout, timeout));

    info!(url = %operation.url, source = %operation.source, "Polling operation");
    emit(
        on_progress,
        ProgressEvent::PollStarted {
            url: operation.url.clone(),
            source: operation.source,
        },
    );

    loop {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        if let Some((at, timeout)) = deadline
            && Instant::now() >= at
        {
            return Err(CoreError::PollTimeout(timeout));
        }

        attempts += 1;
        let request = ApiRequest::get(operation.url.as_str()).bearer(token);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            timeout = expire(deadline) => return Err(CoreError::PollTimeout(timeout)),
            response = exchange.exchange(request) => response?,
        };
        let body = response.text();
        debug!(attempt = attempts, status = response.status, %body, "Operation status response");

        let delay = match extract_status(&body) {
            Ok(reported) => {
                malformed = 0;
                let status = OperationStatus::from_reported(reported.as_deref());
                debug!(attempt = attempts, %status, "Operation status");
                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        attempt: attempts,
                        reported,
                        elapsed: start.elapsed(),
                    },
                );

                match status {
                    OperationStatus::Succeeded => {
                        info!(attempts, "Operation succeeded");
                        emit(
                            on_progress,
                            ProgressEvent::Succeeded {
                                attempts,
                                body: body.clone(),
                            },
                        );
                        return Ok(PollOutcome {
                            status: TerminalStatus::Succeeded,
                            body,
                            attempts,
                            elapsed: start.elapsed(),
                        });
                    }
                    OperationStatus::Failed => {
                        info!(attempts, "Operation reported failure");
                        emit(
                            on_progress,
                            ProgressEvent::Failed {
                                attempts,
                                body: body.clone(),
                            },
                        );
                        return Ok(PollOutcome {
                            status: TerminalStatus::Failed,
                            body,
                            attempts,
                            elapsed: start.elapsed(),
                        });
                    }
                    OperationStatus::Running(_) => options.interval,
                }
            }
            Err(e) => {
                malformed += 1;
                if malformed > options.max_malformed_responses {
                    return Err(CoreError::MalformedPollResponse {
                        url: operation.url.clone(),
                        attempts: malformed,
                        message: e.to_string(),
                    });
                }

                let retry_in = malformed_backoff(options.interval, malformed);
                warn!(attempt = attempts, error = %e, ?retry_in, "Unparsable operation status");
                emit(
                    on_progress,
                    ProgressEvent::MalformedResponse {
                        attempt: attempts,
                        error: e.to_string(),
                        retry_in,
                    },
                );
                retry_in
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            timeout = expire(deadline) => return Err(CoreError::PollTimeout(timeout)),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Completes with the configured timeout once the deadline passes; pends
/// forever when polling is unbounded
async fn expire(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, timeout)) => {
            tokio::time::sleep_until(at).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Doubling delay after consecutive malformed bodies, capped at one minute
fn malformed_backoff(interval: Duration, consecutive: u32) -> Duration {
    interval
        .saturating_mul(2u32.saturating_pow(consecutive))
        .min(MAX_MALFORMED_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_top_level_status() {
        assert_eq!(
            extract_status(r#"{"status":"Running"}"#).unwrap(),
            Some("Running".to_string())
        );
    }

    #[test]
    fn test_extract_nested_status() {
        assert_eq!(
            extract_status(r#"{"properties":{"status":"Failed"}}"#).unwrap(),
            Some("Failed".to_string())
        );
    }

    #[test]
    fn test_top_level_status_wins() {
        let body = r#"{"status":"InProgress","properties":{"status":"Succeeded"}}"#;
        assert_eq!(extract_status(body).unwrap(), Some("InProgress".to_string()));
    }

    #[test]
    fn test_null_status_falls_through_to_properties() {
        let body = r#"{"status":null,"properties":{"status":"Succeeded"}}"#;
        assert_eq!(extract_status(body).unwrap(), Some("Succeeded".to_string()));
    }

    #[test]
    fn test_missing_or_empty_is_none() {
        assert_eq!(extract_status("").unwrap(), None);
        assert_eq!(extract_status("  \n").unwrap(), None);
        assert_eq!(extract_status(r#"{"id":"op-1"}"#).unwrap(), None);
        assert_eq!(extract_status("[1,2]").unwrap(), None);
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(extract_status("<html>gateway</html>").is_err());
    }

    #[test]
    fn test_status_is_case_insensitive() {
        for s in ["succeeded", "SUCCEEDED", "Succeeded"] {
            assert_eq!(OperationStatus::from_reported(Some(s)), OperationStatus::Succeeded);
        }
        for s in ["failed", "FAILED", "Failed"] {
            assert_eq!(OperationStatus::from_reported(Some(s)), OperationStatus::Failed);
        }
    }

    #[test]
    fn test_other_statuses_are_running() {
        assert_eq!(
            OperationStatus::from_reported(Some("Canceled")),
            OperationStatus::Running(Some("Canceled".to_string()))
        );
        assert_eq!(OperationStatus::from_reported(None), OperationStatus::Running(None));
    }

    #[test]
    fn test_malformed_backoff_doubles_and_caps() {
        let interval = Duration::from_secs(5);
        assert_eq!(malformed_backoff(interval, 1), Duration::from_secs(10));
        assert_eq!(malformed_backoff(interval, 2), Duration::from_secs(20));
        assert_eq!(malformed_backoff(interval, 10), MAX_MALFORMED_BACKOFF);
        assert_eq!(malformed_backoff(Duration::ZERO, 3), Duration::ZERO);
    }

    #[test]
    fn test_default_options() {
        let options = PollOptions::default();
        assert_eq!(options.interval, Duration::from_secs(5));
        assert_eq!(options.timeout, None);
        assert_eq!(options.max_malformed_responses, 3);
    }
}
