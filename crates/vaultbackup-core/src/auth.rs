//! Bearer token acquisition for Azure Resource Manager
//!
//! The backup workflow only needs an opaque token string. [`CredentialSource`]
//! picks how to obtain one from the environment, mirroring the usual Azure
//! precedence: an explicit token, then a service principal secret, then AKS
//! workload identity, then the instance metadata service.

use crate::transport::{ApiRequest, ApiResponse, HttpExchange, TransportError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Scope requested for Resource Manager calls
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_IMDS_HOST: &str = "http://169.254.169.254";

const IMDS_TOKEN_PATH: &str = "/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Environment variable names read by [`CredentialSource::from_lookup`]
pub mod env {
    pub const ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";
    pub const TENANT_ID: &str = "AZURE_TENANT_ID";
    pub const CLIENT_ID: &str = "AZURE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
    pub const FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
    pub const AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
    pub const IMDS_HOST: &str = "AZURE_POD_IDENTITY_AUTHORITY_HOST";
}

/// A string whose contents never appear in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

/// An acquired bearer token
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: Secret,
    pub expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn secret(&self) -> &str {
        self.token.expose()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint rejected the request: {status} {body}")]
    Unauthorized { status: u16, body: String },

    #[error("failed to parse token response: {0}")]
    Parse(String),

    #[error("failed to read federated token file {path}: {message}")]
    FederatedToken { path: String, message: String },

    #[error("failed to request token: {0}")]
    Transport(#[from] TransportError),
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

/// How to obtain a token, as selected from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    StaticToken {
        token: Secret,
    },
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: Secret,
        authority_host: String,
    },
    WorkloadIdentity {
        tenant_id: String,
        client_id: String,
        token_file: PathBuf,
        authority_host: String,
    },
    ManagedIdentity {
        client_id: Option<String>,
        imds_host: String,
    },
}

impl CredentialSource {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Select a credential from a key lookup. Managed identity is the
    /// fallback when nothing more specific is configured.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| crate::config::non_blank(lookup(key));
        let authority_host = get(env::AUTHORITY_HOST)
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
            .trim_end_matches('/')
            .to_string();

        if let Some(token) = get(env::ACCESS_TOKEN) {
            return CredentialSource::StaticToken {
                token: Secret::new(token),
            };
        }

        if let (Some(tenant_id), Some(client_id), Some(secret)) = (
            get(env::TENANT_ID),
            get(env::CLIENT_ID),
            get(env::CLIENT_SECRET),
        ) {
            return CredentialSource::ClientSecret {
                tenant_id,
                client_id,
                client_secret: Secret::new(secret),
                authority_host,
            };
        }

        if let (Some(tenant_id), Some(client_id), Some(token_file)) = (
            get(env::TENANT_ID),
            get(env::CLIENT_ID),
            get(env::FEDERATED_TOKEN_FILE),
        ) {
            return CredentialSource::WorkloadIdentity {
                tenant_id,
                client_id,
                token_file: PathBuf::from(token_file),
                authority_host,
            };
        }

        CredentialSource::ManagedIdentity {
            client_id: get(env::CLIENT_ID),
            imds_host: get(env::IMDS_HOST)
                .unwrap_or_else(|| DEFAULT_IMDS_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialSource::StaticToken { .. } => "static-token",
            CredentialSource::ClientSecret { .. } => "client-secret",
            CredentialSource::WorkloadIdentity { .. } => "workload-identity",
            CredentialSource::ManagedIdentity { .. } => "managed-identity",
        }
    }

    /// Build the provider, sending any token requests through `exchange`
    pub fn into_provider(self, exchange: Arc<dyn HttpExchange>) -> Box<dyn TokenProvider> {
        info!(credential = self.kind(), "Using credential");
        match self {
            CredentialSource::StaticToken { token } => Box::new(StaticToken { token }),
            CredentialSource::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority_host,
            } => Box::new(ClientSecretCredential {
                exchange,
                token_url: token_url(&authority_host, &tenant_id),
                client_id,
                client_secret,
            }),
            CredentialSource::WorkloadIdentity {
                tenant_id,
                client_id,
                token_file,
                authority_host,
            } => Box::new(WorkloadIdentityCredential {
                exchange,
                token_url: token_url(&authority_host, &tenant_id),
                client_id,
                token_file,
            }),
            CredentialSource::ManagedIdentity {
                client_id,
                imds_host,
            } => Box::new(ManagedIdentityCredential {
                exchange,
                endpoint: format!("{}{}", imds_host, IMDS_TOKEN_PATH),
                client_id,
            }),
        }
    }
}

/// A token supplied up front
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: Secret,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    fn name(&self) -> &'static str {
        "static-token"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_in: None,
        })
    }
}

/// OAuth2 client-credentials grant with a service principal secret
pub struct ClientSecretCredential {
    exchange: Arc<dyn HttpExchange>,
    token_url: String,
    client_id: String,
    client_secret: Secret,
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "client-secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];
        post_form(self.exchange.as_ref(), &self.token_url, &form).await
    }
}

/// Client-assertion grant using a projected service account token
pub struct WorkloadIdentityCredential {
    exchange: Arc<dyn HttpExchange>,
    token_url: String,
    client_id: String,
    token_file: PathBuf,
}

#[async_trait]
impl TokenProvider for WorkloadIdentityCredential {
    fn name(&self) -> &'static str {
        "workload-identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        // The projected token is rotated on disk, so read it per request.
        let assertion = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| AuthError::FederatedToken {
                path: self.token_file.display().to_string(),
                message: e.to_string(),
            })?;

        let form = [
            ("client_id", self.client_id.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.trim()),
        ];
        post_form(self.exchange.as_ref(), &self.token_url, &form).await
    }
}

/// Instance metadata service token endpoint
pub struct ManagedIdentityCredential {
    exchange: Arc<dyn HttpExchange>,
    endpoint: String,
    client_id: Option<String>,
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed-identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let resource = scope.trim_end_matches("/.default");
        let mut params = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            params.push(("client_id", client_id.as_str()));
        }
        let url = Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| AuthError::Parse(format!("invalid IMDS endpoint: {}", e)))?;

        debug!(endpoint = %self.endpoint, "Requesting managed identity token");
        let response = self
            .exchange
            .exchange(ApiRequest::get(url.as_str()).header("Metadata", "true"))
            .await?;
        parse_token_response(response)
    }
}

fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!("{}/{}/oauth2/v2.0/token", authority_host, tenant_id)
}

async fn post_form(
    exchange: &dyn HttpExchange,
    url: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken, AuthError> {
    let body = serde_urlencoded::to_string(form)
        .map_err(|e| AuthError::Parse(format!("failed to encode token request: {}", e)))?;

    debug!(url, "Requesting token");
    let response = exchange
        .exchange(
            ApiRequest::post(url, body)
                .header("Content-Type", "application/x-www-form-urlencoded"),
        )
        .await?;
    parse_token_response(response)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    // IMDS returns this as a string, AAD as a number
    #[serde(default)]
    expires_in: Option<Value>,
}

fn parse_token_response(response: ApiResponse) -> Result<AccessToken, AuthError> {
    if !response.is_success() {
        return Err(AuthError::Unauthorized {
            status: response.status,
            body: response.text(),
        });
    }

    let payload: TokenResponse =
        serde_json::from_slice(&response.body).map_err(|e| AuthError::Parse(e.to_string()))?;

    let expires_in = payload
        .expires_in
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .map(Duration::from_secs);

    Ok(AccessToken {
        token: Secret::new(payload.access_token),
        expires_in,
    })
}
