//! Shared helpers for vaultbackup-core integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vaultbackup_core::config::keys;
use vaultbackup_core::{
    ApiRequest, ApiResponse, BackupConfig, HttpExchange, HttpMethod, ProgressCallback,
    ProgressEvent, TransportError,
};

/// Exchanger that replays canned responses in order and records requests
#[derive(Default)]
pub struct ScriptedExchange {
    responses: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedExchange {
    pub fn new(responses: Vec<ApiResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

#[async_trait]
impl HttpExchange for ScriptedExchange {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(TransportError::Request {
                method,
                url,
                message: "connection refused".to_string(),
            })
    }
}

/// 200 response with a JSON body
pub fn status_body(status: &str) -> ApiResponse {
    raw_body(&format!(r#"{{"status":"{}"}}"#, status))
}

pub fn raw_body(body: &str) -> ApiResponse {
    ApiResponse {
        status: 200,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

/// 202 response carrying the given headers
pub fn accepted(headers: &[(&str, &str)]) -> ApiResponse {
    ApiResponse {
        status: 202,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: Vec::new(),
    }
}

/// Callback that records every event
pub fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: ProgressCallback = Box::new(move |event| sink.lock().unwrap().push(event));
    (callback, events)
}

/// Configuration pointing at the given management endpoint
pub fn test_config(endpoint: &str) -> BackupConfig {
    let values: HashMap<&str, String> = HashMap::from([
        (keys::SUBSCRIPTION_ID, "00000000-0000-0000-0000-000000000001".to_string()),
        (keys::RESOURCE_GROUP, "rg-backup".to_string()),
        (keys::VAULT_NAME, "vault-aks".to_string()),
        (keys::BACKUP_INSTANCE_NAME, "aks-instance".to_string()),
        (keys::MANAGEMENT_ENDPOINT, endpoint.to_string()),
    ]);
    BackupConfig::from_lookup(|key| values.get(key).cloned()).expect("valid test config")
}

/// Resource path of the backup instance in [`test_config`]
pub const INSTANCE_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg-backup/providers/Microsoft.DataProtection/backupVaults/vault-aks/backupInstances/aks-instance/backup";
