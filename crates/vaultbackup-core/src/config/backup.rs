//! Backup target configuration

use super::error::{ConfigError, Result};
use super::non_blank;
use tracing::debug;
use url::Url;

/// Environment variable names understood by [`BackupConfig::from_lookup`]
pub mod keys {
    pub const SUBSCRIPTION_ID: &str = "SUBSCRIPTION_ID";
    pub const RESOURCE_GROUP: &str = "RESOURCE_GROUP";
    pub const VAULT_NAME: &str = "VAULT_NAME";
    pub const BACKUP_INSTANCE_NAME: &str = "BACKUP_INSTANCE_NAME";
    pub const API_VERSION: &str = "API_VERSION";
    pub const BACKUP_RULE_NAME: &str = "BACKUP_RULE_NAME";
    pub const BACKUP_TAG_NAME: &str = "BACKUP_TAG_NAME";
    pub const BACKUP_TAG_ID: &str = "BACKUP_TAG_ID";
    pub const MANAGEMENT_ENDPOINT: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";
}

pub const DEFAULT_API_VERSION: &str = "2025-07-01";
pub const DEFAULT_RULE_NAME: &str = "Default";
pub const DEFAULT_TAG_NAME: &str = "Default";
pub const DEFAULT_TAG_ID: &str = "Default_";
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Fully resolved settings for one on-demand backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub vault_name: String,
    pub backup_instance_name: String,
    pub api_version: String,
    pub rule_name: String,
    /// Read and validated but not sent with the backup request
    pub tag_name: String,
    /// Read and validated but not sent with the backup request
    pub tag_id: String,
    /// Resource Manager base URL, without a trailing slash
    pub management_endpoint: String,
}

impl BackupConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup
    ///
    /// Required settings are checked in a fixed order and the first missing
    /// one is reported. Optional settings fall back to their defaults when
    /// absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &'static str| non_blank(lookup(key)).ok_or(ConfigError::Missing { key });
        let optional =
            |key: &str, default: &str| non_blank(lookup(key)).unwrap_or_else(|| default.to_string());

        let subscription_id = required(keys::SUBSCRIPTION_ID)?;
        let resource_group = required(keys::RESOURCE_GROUP)?;
        let vault_name = required(keys::VAULT_NAME)?;
        let backup_instance_name = required(keys::BACKUP_INSTANCE_NAME)?;

        let management_endpoint = normalize_endpoint(&optional(
            keys::MANAGEMENT_ENDPOINT,
            DEFAULT_MANAGEMENT_ENDPOINT,
        ))?;

        let config = Self {
            subscription_id,
            resource_group,
            vault_name,
            backup_instance_name,
            api_version: optional(keys::API_VERSION, DEFAULT_API_VERSION),
            rule_name: optional(keys::BACKUP_RULE_NAME, DEFAULT_RULE_NAME),
            tag_name: optional(keys::BACKUP_TAG_NAME, DEFAULT_TAG_NAME),
            tag_id: optional(keys::BACKUP_TAG_ID, DEFAULT_TAG_ID),
            management_endpoint,
        };

        debug!(
            vault = %config.vault_name,
            instance = %config.backup_instance_name,
            api_version = %config.api_version,
            tag_name = %config.tag_name,
            tag_id = %config.tag_id,
            "Resolved backup configuration"
        );

        Ok(config)
    }
}

fn normalize_endpoint(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key: keys::MANAGEMENT_ENDPOINT,
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key: keys::MANAGEMENT_ENDPOINT,
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}
