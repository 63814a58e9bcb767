//! Network fetch pipeline for intercepted requests.
//!
//! ### Failure model
//! - HTTP error statuses (404, 500, ...) are responses, not failures
//! - Transport problems (DNS, refused connection, timeout, body read) are failures
//! - Bodies over `max_bytes` are failures, so no truncated payload is ever handed
//!   to the cache
//!
//! ### Cache modes
//! - `Default`: plain request
//! - `Bypass`: asks every intermediary to revalidate with the origin server

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

use dxquiz_core::{AppConfig, Error, Request, Response};

/// How a fetch treats intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Force a round trip to the origin server.
    Bypass,
}

/// Something that can perform a fetch on behalf of the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request`, returning the full response or a transport failure.
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string (default: "dxquiz-worker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "dxquiz-worker/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for NetworkConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: NetworkConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: NetworkConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("timed out after {}ms", self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("network error: {}", err))
        }
    }

    fn check_size(&self, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }
        Ok(())
    }

    /// Reject a declared `Content-Length` over the limit before reading the body.
    fn check_content_length(&self, len: u64) -> Result<(), Error> {
        self.check_size(usize::try_from(len).unwrap_or(usize::MAX))
    }
}

fn collect_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method(), e)))?;

        let mut builder = self.http.request(method, request.url().as_str());
        if mode == CacheMode::Bypass {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        if let Some(len) = response.content_length() {
            self.check_content_length(len)?;
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());

        let bytes: Bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        self.check_size(bytes.len())?;

        tracing::debug!(
            "fetched {} -> {} status {} in {}ms ({} bytes, {:?})",
            request.url(),
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len(),
            mode
        );

        Ok(Response::new(status.as_u16(), headers, bytes))
    }
}
