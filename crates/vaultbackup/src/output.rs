//! Console rendering of backup progress
//!
//! Output is plain human-readable text on stdout; there is no machine-readable
//! contract. Diagnostics go to stderr through [`crate::error`].

use colored::Colorize;
use vaultbackup_core::{BackupOutcome, ProgressEvent};

/// Render one progress event as console lines
pub fn format_event(event: &ProgressEvent) -> Vec<String> {
    match event {
        ProgressEvent::Triggering { url, body } => vec![
            format!("Request URL: {}", url),
            format!("Request Body: {}", body),
        ],
        ProgressEvent::Triggered {
            status,
            headers,
            body,
        } => {
            let status_line = if (200..300).contains(status) {
                format!("Status: {}", status)
            } else {
                format!("Status: {}", status.to_string().yellow().bold())
            };
            let mut lines = vec![status_line, "Headers:".to_string()];
            lines.extend(
                headers
                    .iter()
                    .map(|(name, value)| format!("  {}: {}", name, value)),
            );
            lines.push(format!("Body: {}", body));
            lines
        }
        ProgressEvent::NoAsyncOperation => {
            vec!["No async URL returned. Nothing to poll.".to_string()]
        }
        ProgressEvent::PollStarted { url, source } => {
            vec![format!("Polling ({}): {}", source, url)]
        }
        ProgressEvent::Polling {
            attempt,
            reported,
            elapsed,
        } => vec![format!(
            "status={} (attempt {}, {}s)",
            reported.as_deref().unwrap_or("null"),
            attempt,
            elapsed.as_secs()
        )],
        ProgressEvent::MalformedResponse {
            attempt,
            error,
            retry_in,
        } => vec![format!(
            "{} unparsable status response (attempt {}): {}; retrying in {}s",
            "warning:".yellow().bold(),
            attempt,
            error,
            retry_in.as_secs()
        )],
        ProgressEvent::Succeeded { .. } => {
            vec![format!("{}", "Operation succeeded.".green().bold())]
        }
        ProgressEvent::Failed { body, .. } => {
            vec![format!("{} {}", "Operation failed:".red().bold(), body)]
        }
    }
}

/// Progress callback target that prints to stdout
pub fn print_event(event: ProgressEvent) {
    for line in format_event(&event) {
        println!("{}", line);
    }
}

/// One-line summary printed once the run is over
pub fn format_summary(outcome: &BackupOutcome) -> String {
    match outcome {
        BackupOutcome::Completed { trigger_status } => {
            format!("Backup request completed with status {}", trigger_status)
        }
        BackupOutcome::Succeeded { poll, .. } => format!(
            "Backup succeeded after {} status checks ({}s)",
            poll.attempts,
            poll.elapsed.as_secs()
        ),
        BackupOutcome::Failed { poll, .. } => format!(
            "Backup failed after {} status checks ({}s)",
            poll.attempts,
            poll.elapsed.as_secs()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vaultbackup_core::{AsyncHeader, PollOutcome, TerminalStatus};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_trigger_lines() {
        plain();
        let lines = format_event(&ProgressEvent::Triggered {
            status: 202,
            headers: vec![("location".to_string(), "https://op".to_string())],
            body: String::new(),
        });
        assert_eq!(
            lines,
            vec!["Status: 202", "Headers:", "  location: https://op", "Body: "]
        );
    }

    #[test]
    fn test_polling_line_with_missing_status() {
        let lines = format_event(&ProgressEvent::Polling {
            attempt: 2,
            reported: None,
            elapsed: Duration::from_secs(5),
        });
        assert_eq!(lines, vec!["status=null (attempt 2, 5s)"]);
    }

    #[test]
    fn test_poll_started_names_header() {
        let lines = format_event(&ProgressEvent::PollStarted {
            url: "https://op".to_string(),
            source: AsyncHeader::AzureAsyncOperation,
        });
        assert_eq!(lines, vec!["Polling (Azure-AsyncOperation): https://op"]);
    }

    #[test]
    fn test_failed_includes_body() {
        plain();
        let lines = format_event(&ProgressEvent::Failed {
            attempts: 1,
            body: r#"{"status":"Failed"}"#.to_string(),
        });
        assert_eq!(lines, vec![r#"Operation failed: {"status":"Failed"}"#]);
    }

    #[test]
    fn test_summary() {
        let outcome = BackupOutcome::Succeeded {
            trigger_status: 202,
            poll: PollOutcome {
                status: TerminalStatus::Succeeded,
                body: String::new(),
                attempts: 3,
                elapsed: Duration::from_secs(10),
            },
        };
        assert_eq!(
            format_summary(&outcome),
            "Backup succeeded after 3 status checks (10s)"
        );
        assert_eq!(
            format_summary(&BackupOutcome::Completed { trigger_status: 200 }),
            "Backup request completed with status 200"
        );
    }
}
