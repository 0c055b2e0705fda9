//! HTTP network interface for the cache agent.
//!
//! The agent issues every network request through the [`Network`] trait so
//! tests can substitute a scripted backend and count calls. [`HttpNetwork`]
//! is the real implementation over reqwest.
//!
//! Unlike a plain HTTP client, error-status responses are *not* errors
//! here: the agent must serve invalid responses (404s, cross-origin
//! opaque content) to the caller unmodified. Only transport-level
//! failures (DNS, connect, timeout) surface as `Err`.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, is_web_scheme, resolve, same_origin};

use stratus_core::{AppConfig, Error, Snapshot};

/// Configuration for the HTTP network backend.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stratus/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stratus/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Derive the network configuration from application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// An intercepted request descriptor: method, URL, headers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WebRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl WebRequest {
    /// Build a request descriptor with an explicit method.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into(), url: url.into(), headers: Vec::new() }
    }

    /// Build a GET request descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Whether this is a GET request (the only method the agent intercepts).
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Response from a network fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Recorded validity condition for caching: status exactly 200 and
    /// final URL same-origin with the agent's scope.
    pub fn is_cacheable(&self, scope: &Url) -> bool {
        self.status == StatusCode::OK && same_origin(&self.final_url, scope)
    }

    /// Headers as a JSON array of name/value pairs, for snapshot storage.
    pub fn headers_json(&self) -> Option<String> {
        let pairs: Vec<(&str, &str)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        serde_json::to_string(&pairs).ok()
    }

    /// Capture this exchange as a snapshot keyed by request method + URL.
    ///
    /// The body buffer is shared, not re-read; the caller keeps serving
    /// the response while the snapshot copy goes to storage.
    pub fn to_snapshot(&self, method: &str) -> Snapshot {
        Snapshot::new(
            method,
            self.url.as_str(),
            self.status.as_u16(),
            self.content_type.clone(),
            self.headers_json(),
            self.bytes.to_vec(),
        )
    }
}

/// Network seam the agent issues requests through.
///
/// `Err` means the request never produced an HTTP response at all
/// (offline, DNS failure, timeout). Error statuses come back as `Ok`.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed network implementation.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a network backend with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|e| Error::HttpError(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::Offline(format!("{}: {}", request.url, e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} status {} in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
