//! Configuration for a backup run
//!
//! Settings are resolved from a key lookup (normally the process environment)
//! so that every required value is validated before any network activity.
//! Blank values are treated the same as absent ones.

pub mod backup;
pub mod error;

pub use backup::{BackupConfig, keys};
pub use error::{ConfigError, Result};

/// Return the value only if it contains something other than whitespace
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
