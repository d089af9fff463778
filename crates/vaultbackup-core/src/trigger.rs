//! Backup trigger: one authenticated POST and async handle extraction

use crate::error::Result;
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use crate::request::BackupRequest;
use crate::transport::{ApiRequest, ApiResponse, HttpExchange};
use std::fmt;
use tracing::{debug, info, warn};

/// Response header an async operation URL was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncHeader {
    AzureAsyncOperation,
    Location,
}

impl AsyncHeader {
    /// Headers in order of preference
    pub const PREFERENCE: [AsyncHeader; 2] = [AsyncHeader::AzureAsyncOperation, AsyncHeader::Location];

    pub const fn name(self) -> &'static str {
        match self {
            AsyncHeader::AzureAsyncOperation => "Azure-AsyncOperation",
            AsyncHeader::Location => "Location",
        }
    }
}

impl fmt::Display for AsyncHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncOperation {
    pub url: String,
    pub source: AsyncHeader,
}

impl AsyncOperation {
    /// Extract the operation URL from a response, if it carries one.
    ///
    /// `Azure-AsyncOperation` wins when present and non-empty; `Location` is
    /// the fallback. The status code is not consulted.
    pub fn from_response(response: &ApiResponse) -> Option<Self> {
        AsyncHeader::PREFERENCE.into_iter().find_map(|source| {
            response
                .header(source.name())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|url| AsyncOperation {
                    url: url.to_string(),
                    source,
                })
        })
    }
}

/// Result of the trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// No async operation was returned; nothing to poll
    Completed { status: u16 },
    /// The service accepted the request and returned an operation to poll
    Accepted {
        status: u16,
        operation: AsyncOperation,
    },
}

/// POST the backup request and inspect the response for an async operation.
///
/// Transport faults are returned as errors. A non-2xx status is logged and
/// reported through the progress callback but otherwise handled like any
/// other response.
pub async fn trigger_backup(
    exchange: &dyn HttpExchange,
    request: &BackupRequest,
    token: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<TriggerOutcome> {
    emit(
        on_progress,
        ProgressEvent::Triggering {
            url: request.url().to_string(),
            body: request.body().to_string(),
        },
    );

    info!(url = request.url(), "Triggering backup");
    let response = exchange
        .exchange(
            ApiRequest::post(request.url(), request.body())
                .bearer(token)
                .header("Content-Type", "application/json"),
        )
        .await?;

    let status = response.status;
    let body = response.text();
    debug!(status, headers = ?response.headers, %body, "Trigger response");
    if !response.is_success() {
        warn!(status, "Backup trigger returned a non-success status");
    }

    emit(
        on_progress,
        ProgressEvent::Triggered {
            status,
            headers: response.headers.clone(),
            body,
        },
    );

    match AsyncOperation::from_response(&response) {
        Some(operation) => {
            info!(url = %operation.url, source = %operation.source, "Async operation returned");
            Ok(TriggerOutcome::Accepted { status, operation })
        }
        None => {
            info!("No async operation returned");
            emit(on_progress, ProgressEvent::NoAsyncOperation);
            Ok(TriggerOutcome::Completed { status })
        }
    }
}
