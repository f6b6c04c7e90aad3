//! Unit tests for the HTTP transport

use super::*;

use quarry_core::utils::{md5_hex, sha256_hex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retries() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_registry_client_creation() {
    let client = RegistryClient::new().unwrap();
    assert_eq!(client.retry_config().max_retries, 3);
}

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.initial_delay, Duration::from_millis(100));
    assert_eq!(config.max_delay, Duration::from_secs(10));
    assert_eq!(config.multiplier, 2.0);
    assert_eq!(RetryConfig::none().max_retries, 0);
}

#[test]
fn test_auth_header() {
    let none = AuthConfig::default();
    assert!(none.header().unwrap().is_none());

    let basic = AuthConfig {
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
        ..AuthConfig::default()
    };
    assert_eq!(basic.header().unwrap().unwrap(), "Basic dXNlcjpwYXNz");

    let both = AuthConfig {
        token: Some("abc".to_string()),
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
    };
    assert_eq!(both.header().unwrap().unwrap(), "Bearer abc");
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("---\nrake 13.0.6\n"))
        .mount(&mock_server)
        .await;

    let client = RegistryClient::new().unwrap();
    let url = format!("{}/versions", mock_server.uri());
    let bytes = client.fetch(&url, None).await.unwrap();
    assert_eq!(bytes, b"---\nrake 13.0.6\n");
}

#[tokio::test]
async fn test_fetch_with_bearer_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info/rake"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("---\n"))
        .mount(&mock_server)
        .await;

    let client = RegistryClient::with_auth(AuthConfig {
        token: Some("secret".to_string()),
        ..AuthConfig::default()
    })
    .unwrap();
    let url = format!("{}/info/rake", mock_server.uri());
    assert!(client.fetch(&url, None).await.is_ok());
}

#[tokio::test]
async fn test_fetch_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RegistryClient::with_config(None, fast_retries()).unwrap();
    let url = format!("{}/info/missing", mock_server.uri());

    match client.fetch(&url, None).await.unwrap_err() {
        QuarryError::NotFound { url: missing } => assert_eq!(missing, url),
        other => panic!("Expected NotFound error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/versions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = RegistryClient::with_config(None, fast_retries()).unwrap();
    let url = format!("{}/versions", mock_server.uri());

    let err = client.fetch(&url, None).await.unwrap_err();
    assert!(matches!(err, QuarryError::Transport { .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_client_errors_are_fatal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/versions"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RegistryClient::with_config(None, fast_retries()).unwrap();
    let url = format!("{}/versions", mock_server.uri());
    assert!(client.fetch(&url, None).await.is_err());
}

#[tokio::test]
async fn test_digest_verification() {
    let mock_server = MockServer::start().await;
    let body = b"---\n1.0.0 |checksum:abc\n".to_vec();
    Mock::given(method("GET"))
        .and(path("/info/mygem"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&mock_server)
        .await;

    let client = RegistryClient::new().unwrap();
    let url = format!("{}/info/mygem", mock_server.uri());

    let md5 = ExpectedDigest::Md5(md5_hex(&body));
    assert_eq!(client.fetch(&url, Some(&md5)).await.unwrap(), body);

    let sha = ExpectedDigest::Sha256(sha256_hex(&body).to_uppercase());
    assert!(client.fetch(&url, Some(&sha)).await.is_ok());

    let wrong = ExpectedDigest::Md5("0".repeat(32));
    match client.fetch(&url, Some(&wrong)).await.unwrap_err() {
        QuarryError::IntegrityFailure { artifact, .. } => assert_eq!(artifact, url),
        other => panic!("Expected IntegrityFailure error, got {:?}", other),
    }
}
