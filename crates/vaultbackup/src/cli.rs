//! CLI structure and argument definitions
//!
//! Every setting can come from a flag or from its environment variable, so
//! the tool runs unchanged as a Kubernetes job configured through `env:`.

use clap::Parser;
use std::time::Duration;
use vaultbackup_core::PollOptions;
use vaultbackup_core::config::keys;

/// Trigger an on-demand Azure Data Protection backup and wait for it
#[derive(Parser, Debug)]
#[command(name = "vaultbackup")]
#[command(
    version,
    about = "Trigger an on-demand Azure Data Protection backup and wait for it to finish"
)]
#[command(long_about = "
Trigger an on-demand Azure Data Protection backup and wait for it to finish

The backup instance is addressed by subscription, resource group, vault and
instance name. After the backup is triggered, the operation returned in the
Azure-AsyncOperation (or Location) header is polled until it reports
Succeeded or Failed.

CREDENTIALS (first match wins):
    AZURE_ACCESS_TOKEN                                   pre-acquired token
    AZURE_TENANT_ID + AZURE_CLIENT_ID + AZURE_CLIENT_SECRET   service principal
    AZURE_TENANT_ID + AZURE_CLIENT_ID + AZURE_FEDERATED_TOKEN_FILE   workload identity
    otherwise                                            managed identity (IMDS)

EXIT CODES:
    0   backup succeeded, or nothing to poll
    1   error (configuration, credentials, network, cancelled)
    3   backup operation reported Failed
        (plain trigger scripts exit 0 here; this one does not, so a
        Kubernetes Job is marked failed)

EXAMPLES:
    # Everything from the environment (typical AKS CronJob)
    vaultbackup

    # Explicit target with a specific policy rule
    vaultbackup --subscription-id SUB --resource-group rg --vault-name vault \\
        --backup-instance-name instance --backup-rule-name BackupHourly

    # Stop waiting after an hour
    vaultbackup --wait-timeout 3600
")]
pub struct Cli {
    /// Subscription containing the backup vault
    #[arg(long, env = "SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// Resource group of the backup vault
    #[arg(long, env = "RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Backup vault name
    #[arg(long, env = "VAULT_NAME")]
    pub vault_name: Option<String>,

    /// Backup instance to back up
    #[arg(long, env = "BACKUP_INSTANCE_NAME")]
    pub backup_instance_name: Option<String>,

    /// Data Protection API version [default: 2025-07-01]
    #[arg(long, env = "API_VERSION")]
    pub api_version: Option<String>,

    /// Backup policy rule to run [default: Default]
    #[arg(long, env = "BACKUP_RULE_NAME")]
    pub backup_rule_name: Option<String>,

    /// Retention tag name [default: Default]
    #[arg(long, env = "BACKUP_TAG_NAME")]
    pub backup_tag_name: Option<String>,

    /// Retention tag id [default: Default_]
    #[arg(long, env = "BACKUP_TAG_ID")]
    pub backup_tag_id: Option<String>,

    /// Resource Manager endpoint [default: https://management.azure.com]
    #[arg(long, env = "AZURE_RESOURCE_MANAGER_ENDPOINT")]
    pub management_endpoint: Option<String>,

    /// Seconds between operation status requests (at least 1)
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Stop waiting after this many seconds (default: wait until finished)
    #[arg(long, env = "POLL_TIMEOUT_SECS")]
    pub wait_timeout: Option<u64>,

    /// Consecutive unparsable status responses tolerated before giving up
    #[arg(long, default_value = "3")]
    pub max_malformed_responses: u32,

    /// Enable verbose logging
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Value supplied for a configuration key, by flag or environment
    pub fn setting(&self, key: &str) -> Option<String> {
        let value = match key {
            keys::SUBSCRIPTION_ID => &self.subscription_id,
            keys::RESOURCE_GROUP => &self.resource_group,
            keys::VAULT_NAME => &self.vault_name,
            keys::BACKUP_INSTANCE_NAME => &self.backup_instance_name,
            keys::API_VERSION => &self.api_version,
            keys::BACKUP_RULE_NAME => &self.backup_rule_name,
            keys::BACKUP_TAG_NAME => &self.backup_tag_name,
            keys::BACKUP_TAG_ID => &self.backup_tag_id,
            keys::MANAGEMENT_ENDPOINT => &self.management_endpoint,
            _ => return None,
        };
        value.clone()
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.poll_interval),
            timeout: self.wait_timeout.map(Duration::from_secs),
            max_malformed_responses: self.max_malformed_responses,
        }
    }
}

/// Command-line flag for a configuration key
pub fn flag_for_key(key: &str) -> Option<&'static str> {
    Some(match key {
        keys::SUBSCRIPTION_ID => "--subscription-id",
        keys::RESOURCE_GROUP => "--resource-group",
        keys::VAULT_NAME => "--vault-name",
        keys::BACKUP_INSTANCE_NAME => "--backup-instance-name",
        keys::API_VERSION => "--api-version",
        keys::BACKUP_RULE_NAME => "--backup-rule-name",
        keys::BACKUP_TAG_NAME => "--backup-tag-name",
        keys::BACKUP_TAG_ID => "--backup-tag-id",
        keys::MANAGEMENT_ENDPOINT => "--management-endpoint",
        _ => return None,
    })
}
