//! Backup request construction

use crate::config::BackupConfig;

/// Escape backslash and double quote for embedding in a JSON string literal.
///
/// Control characters are passed through unchanged, so a rule name containing
/// one produces an invalid body. Azure rule names never contain them.
pub fn escape_json_fragment(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// An on-demand backup request; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    url: String,
    body: String,
}

impl BackupRequest {
    pub fn new(config: &BackupConfig) -> Self {
        Self {
            url: format!(
                "{}/backup?api-version={}",
                resource_url(config),
                config.api_version
            ),
            body: format!(
                r#"{{"backupRuleOptions":{{"ruleName":"{}"}}}}"#,
                escape_json_fragment(&config.rule_name)
            ),
        }
    }

    /// Full POST target, including the api-version query parameter
    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON request body
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Resource Manager URL of the backup instance
pub fn resource_url(config: &BackupConfig) -> String {
    format!(
        "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataProtection/backupVaults/{}/backupInstances/{}",
        config.management_endpoint,
        config.subscription_id,
        config.resource_group,
        config.vault_name,
        config.backup_instance_name
    )
}
