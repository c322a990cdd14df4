//! Core HTTP operations with rate limiting
//!
//! [`Transport`] is the seam between the pipeline and the network: the catalog
//! client and the download orchestrator only ever talk to a `Transport`, which
//! lets tests script the remote site. [`HttpHandler`] is the real implementation
//! on top of reqwest with a shared governor rate limiter. Handlers make exactly
//! one attempt per call; retries belong to [`crate::app::retry::RetryPolicy`].

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::errors::{AppError, ConfigError, DownloadError, DownloadResult};

/// Network operations the pipeline depends on
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch an HTML page as text
    async fn fetch_page(&self, url: &Url) -> DownloadResult<String>;

    /// Check that a resource is live, returning its advertised size if any
    async fn probe(&self, url: &Url) -> DownloadResult<Option<u64>>;

    /// Stream a resource into `destination`, returning bytes written
    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64>;
}

type DirectLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler backed by reqwest
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectLimiter,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl HttpHandler {
    /// Build a handler from client configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero rate limit and
    /// `DownloadError::Http` if the reqwest client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        let client = config.build_http_client()?;

        tracing::debug!(
            "Created HTTP handler for {} at {} requests/s",
            config.base_url,
            config.rate_limit_rps
        );

        Ok(Self {
            client,
            rate_limiter,
            request_timeout: config.request_timeout,
            download_timeout: config.download_timeout,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> Result<DirectLimiter, ConfigError> {
        let rate = NonZeroU32::new(rate_limit_rps).ok_or_else(|| ConfigError::InvalidValue {
            field: "client.rate_limit_rps".to_string(),
            value: rate_limit_rps.to_string(),
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rate)))
    }

    /// Send a request after waiting on the rate limiter, mapping error statuses
    async fn send(&self, request: RequestBuilder, url: &Url) -> DownloadResult<Response> {
        // One limiter is shared by every request of this handler
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} {}", status.as_u16(), url);
            return Ok(response);
        }

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => DownloadError::RateLimitExceeded,
            StatusCode::SERVICE_UNAVAILABLE => DownloadError::ServerOverloaded,
            StatusCode::NOT_FOUND | StatusCode::GONE => DownloadError::NotFound {
                url: url.to_string(),
            },
            StatusCode::FORBIDDEN => DownloadError::Forbidden {
                url: url.to_string(),
            },
            status => DownloadError::ServerError {
                status: status.as_u16(),
            },
        })
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpHandler {
    async fn fetch_page(&self, url: &Url) -> DownloadResult<String> {
        let request = self.client.get(url.as_str()).timeout(self.request_timeout);
        let response = self.send(request, url).await?;
        Ok(response.text().await?)
    }

    async fn probe(&self, url: &Url) -> DownloadResult<Option<u64>> {
        let request = self.client.head(url.as_str()).timeout(self.request_timeout);
        let response = self.send(request, url).await?;

        // HEAD bodies are empty; the size only comes from the header
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        Ok(size)
    }

    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        let request = self.client.get(url.as_str()).timeout(self.download_timeout);
        let mut response = self.send(request, url).await?;

        let mut file = File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("Wrote {} bytes from {}", written, url);
        Ok(written)
    }
}
