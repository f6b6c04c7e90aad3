//! HTTP client implementation with connection pooling and retry logic

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, warn};

use quarry_core::utils::ExpectedDigest;
use quarry_core::QuarryError;

use crate::fetcher::Fetcher;
use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Authentication for the remote repository. A token wins over basic auth.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

impl AuthConfig {
    fn header(&self) -> RegistryResult<Option<HeaderValue>> {
        let value = if let Some(token) = &self.token {
            format!("Bearer {}", token)
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            use base64::{engine::general_purpose, Engine as _};
            format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{}:{}", username, password))
            )
        } else {
            return Ok(None);
        };

        let mut header = HeaderValue::from_str(&value)
            .map_err(|e| QuarryError::transport("Invalid authorization header".to_string(), e))?;
        header.set_sensitive(true);
        Ok(Some(header))
    }
}

/// Outcome of one failed attempt
enum Failure {
    /// Worth another attempt (connection errors, 5xx, 429)
    Transient(QuarryError),
    /// Retrying cannot help
    Fatal(QuarryError),
}

/// HTTP transport for a remote gem repository
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
}

impl RegistryClient {
    /// Create new client with connection pooling and default retries
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(None, RetryConfig::default())
    }

    /// Create client with authentication
    pub fn with_auth(auth: AuthConfig) -> RegistryResult<Self> {
        Self::with_config(Some(auth), RetryConfig::default())
    }

    /// Create client with custom configuration
    pub fn with_config(auth: Option<AuthConfig>, retry_config: RetryConfig) -> RegistryResult<Self> {
        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(60))
            .gzip(true)
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")));

        if let Some(header) = auth.as_ref().map(AuthConfig::header).transpose()?.flatten() {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, header);
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| QuarryError::transport("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            retry_config,
        })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// Execute a request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, url: &str, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, Failure>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Failure::Fatal(error)) => return Err(error),
                Err(Failure::Transient(error)) => {
                    if attempt >= self.retry_config.max_retries {
                        return Err(error);
                    }
                    attempt += 1;
                    warn!(%url, attempt, error = %error, "retrying request");

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }
    }

    /// GET a resource and return its body
    pub async fn get_bytes(&self, url: &str) -> RegistryResult<Vec<u8>> {
        self.with_retry(url, || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                Failure::Transient(QuarryError::transport(format!("Failed to fetch {}", url), e))
            })?;

            match response.status() {
                status if status.is_success() => {
                    let bytes = response.bytes().await.map_err(|e| {
                        Failure::Transient(QuarryError::transport(
                            format!("Failed to read body of {}", url),
                            e,
                        ))
                    })?;
                    debug!(%url, size = bytes.len(), "fetched");
                    Ok(bytes.to_vec())
                },
                StatusCode::NOT_FOUND | StatusCode::GONE => {
                    Err(Failure::Fatal(QuarryError::NotFound {
                        url: url.to_string(),
                    }))
                },
                status => {
                    let error = QuarryError::Transport {
                        message: format!("{} returned status {}", url, status),
                        source: None,
                    };
                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        Err(Failure::Transient(error))
                    } else {
                        Err(Failure::Fatal(error))
                    }
                },
            }
        })
        .await
    }
}

#[async_trait]
impl Fetcher for RegistryClient {
    async fn fetch(&self, url: &str, expected: Option<&ExpectedDigest>) -> RegistryResult<Vec<u8>> {
        let bytes = self.get_bytes(url).await?;
        // A mismatch means the remote changed underneath us, not a flaky link
        if let Some(expected) = expected {
            expected.verify(url, &bytes)?;
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests;
