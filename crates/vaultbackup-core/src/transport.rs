//! HTTP transport seam
//!
//! Every outbound call (token requests, the backup trigger, operation polls)
//! goes through [`HttpExchange`], so the protocol logic can be driven by a
//! scripted exchanger in tests instead of a live endpoint.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Total budget for a single request/response exchange
pub const CALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// User agent string for outbound requests
const USER_AGENT: &str = concat!("vaultbackup/", env!("CARGO_PKG_VERSION"));

/// HTTP methods used by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach `Authorization: Bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

/// A received response; short-lived and read-only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures; these are never retried
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{method} {url} timed out")]
    Timeout { method: HttpMethod, url: String },

    #[error("{method} {url} failed: {message}")]
    Request {
        method: HttpMethod,
        url: String,
        message: String,
    },
}

/// Sends a request and returns the complete response
#[async_trait]
pub trait HttpExchange: Send + Sync {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`HttpExchange`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    /// Create an exchanger with the default five-minute call budget
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(CALL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Request {
                method: HttpMethod::Get,
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        trace!(%method, %url, "Sending request");

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    method,
                    url: url.clone(),
                }
            } else {
                TransportError::Request {
                    method,
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        };

        let mut builder = match method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.bytes().await.map_err(map_err)?.to_vec();

        trace!(%method, %url, status, bytes = body.len(), "Received response");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
