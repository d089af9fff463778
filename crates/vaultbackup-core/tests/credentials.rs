//! Token acquisition against mock identity endpoints

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use vaultbackup_core::auth::{MANAGEMENT_SCOPE, env};
use vaultbackup_core::{AuthError, CredentialSource, HttpExchange, ReqwestExchange, TokenProvider};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn exchange() -> Arc<dyn HttpExchange> {
    Arc::new(ReqwestExchange::new().unwrap())
}

fn source(pairs: &[(&str, &str)]) -> CredentialSource {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    CredentialSource::from_lookup(|key| map.get(key).cloned())
}

#[tokio::test]
async fn test_client_secret_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-1"))
        .and(body_string_contains("client_secret=s3cr3t"))
        .and(body_string_contains(
            "scope=https%3A%2F%2Fmanagement.azure.com%2F.default",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "aad-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = source(&[
        (env::TENANT_ID, "tenant-1"),
        (env::CLIENT_ID, "app-1"),
        (env::CLIENT_SECRET, "s3cr3t"),
        (env::AUTHORITY_HOST, server.uri().as_str()),
    ])
    .into_provider(exchange());

    assert_eq!(provider.name(), "client-secret");
    let token = provider.get_token(MANAGEMENT_SCOPE).await.unwrap();
    assert_eq!(token.secret(), "aad-token");
    assert_eq!(token.expires_in.map(|d| d.as_secs()), Some(3599));
}

#[tokio::test]
async fn test_client_secret_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})),
        )
        .mount(&server)
        .await;

    let provider = source(&[
        (env::TENANT_ID, "tenant-1"),
        (env::CLIENT_ID, "app-1"),
        (env::CLIENT_SECRET, "wrong"),
        (env::AUTHORITY_HOST, server.uri().as_str()),
    ])
    .into_provider(exchange());

    let err = provider.get_token(MANAGEMENT_SCOPE).await.unwrap_err();
    match err {
        AuthError::Unauthorized { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid_client"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_workload_identity_sends_federated_assertion() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("azure-identity-token");
    std::fs::write(&token_file, "projected.jwt.value\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/tenant-2/oauth2/v2.0/token"))
        .and(body_string_contains("client_assertion=projected.jwt.value"))
        .and(body_string_contains(
            "client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "wi-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = source(&[
        (env::TENANT_ID, "tenant-2"),
        (env::CLIENT_ID, "app-2"),
        (env::FEDERATED_TOKEN_FILE, token_file.to_str().unwrap()),
        (env::AUTHORITY_HOST, server.uri().as_str()),
    ])
    .into_provider(exchange());

    let token = provider.get_token(MANAGEMENT_SCOPE).await.unwrap();
    assert_eq!(token.secret(), "wi-token");
}

#[tokio::test]
async fn test_workload_identity_missing_file() {
    let provider = source(&[
        (env::TENANT_ID, "tenant-2"),
        (env::CLIENT_ID, "app-2"),
        (env::FEDERATED_TOKEN_FILE, "/nonexistent/vaultbackup/token"),
    ])
    .into_provider(exchange());

    let err = provider.get_token(MANAGEMENT_SCOPE).await.unwrap_err();
    assert!(matches!(err, AuthError::FederatedToken { .. }));
}

#[tokio::test]
async fn test_managed_identity_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/identity/oauth2/token"))
        .and(header("metadata", "true"))
        .and(query_param("api-version", "2018-02-01"))
        .and(query_param("resource", "https://management.azure.com"))
        .and(query_param("client_id", "mi-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mi-token",
            "expires_in": "86399",
            "resource": "https://management.azure.com",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = source(&[
        (env::CLIENT_ID, "mi-client"),
        (env::IMDS_HOST, server.uri().as_str()),
    ])
    .into_provider(exchange());

    assert_eq!(provider.name(), "managed-identity");
    let token = provider.get_token(MANAGEMENT_SCOPE).await.unwrap();
    assert_eq!(token.secret(), "mi-token");
    assert_eq!(token.expires_in.map(|d| d.as_secs()), Some(86399));
}

#[tokio::test]
async fn test_unparsable_token_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/identity/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = source(&[(env::IMDS_HOST, server.uri().as_str())]).into_provider(exchange());

    let err = provider.get_token(MANAGEMENT_SCOPE).await.unwrap_err();
    assert!(matches!(err, AuthError::Parse(_)));
}
