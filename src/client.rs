//! The base HTTP client shared by every ODP API client.
//!
//! [`OdpClient`] owns the pooled transport, the authentication headers, and
//! the retry policy. One logical API call goes through [`OdpClient::send`],
//! which dispatches the request, transparently retries transient failures,
//! and maps terminal error statuses onto the typed taxonomy. The typed and
//! raw-JSON entry points ([`OdpClient::fetch`], [`OdpClient::fetch_json`])
//! and the streaming entry point ([`OdpClient::stream`]) all sit on top of
//! `send`.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderValue, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::retry::parse_retry_after;
use crate::{ApiRequest, Error, Result, RetryPolicy};

/// Default base URL for the USPTO Open Data Portal.
pub const DEFAULT_BASE_URL: &str = "https://api.uspto.gov";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "USPTO_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "USPTO_API_BASE_URL";

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for the USPTO Open Data Portal APIs.
///
/// The client is cheap to clone and safe to share across tasks; all clones
/// use the same connection pool. The pool is released when the last clone is
/// dropped.
///
/// # Examples
///
/// ```no_run
/// use uspto_odp::{ApiRequest, OdpClient};
///
/// # async fn example() -> Result<(), uspto_odp::Error> {
/// let client = OdpClient::builder()
///     .api_key("my-key")
///     .build()?;
///
/// let products = client
///     .fetch_json(ApiRequest::get("api/v1/datasets/products/search").with_query("limit", "5"))
///     .await?;
/// println!("{products}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OdpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl OdpClient {
    /// Creates a new [`OdpClientBuilder`].
    pub fn builder() -> OdpClientBuilder {
        OdpClientBuilder::new()
    }

    /// Creates a client from `USPTO_API_KEY` and `USPTO_API_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        OdpClientBuilder::from_env().build()
    }

    /// The normalized base URL this client resolves endpoints against.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Performs one logical API call and returns the successful raw response.
    ///
    /// Transient failures (429 and 5xx statuses, connection and timeout
    /// errors) are retried according to the client's [`RetryPolicy`] before
    /// anything is reported; once the budget is exhausted the failure
    /// surfaces exactly like a first-attempt failure of the same kind. Error
    /// statuses are mapped through [`Error::from_response_parts`] — this
    /// method never returns a non-2xx response.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response> {
        if request.method != Method::GET && request.method != Method::POST {
            return Err(Error::UnsupportedMethod(request.method));
        }
        let url = self.resolve_url(&request)?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.execute(&request, url.clone(), attempt).await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::info!(
                            status = status.as_u16(),
                            attempts = attempt,
                            "Received HTTP response"
                        );
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    if self.inner.retry_policy.should_retry_status(status) {
                        if let Some(delay) =
                            self.inner.retry_policy.delay_for_attempt(attempt, retry_after)
                        {
                            tracing::warn!(
                                status = status.as_u16(),
                                attempt = attempt,
                                delay_ms = delay.as_millis(),
                                "Transient error status, retrying after delay"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status.is_client_error() {
                        tracing::error!(status = status.as_u16(), response = %body, "Client error");
                    } else {
                        tracing::warn!(status = status.as_u16(), response = %body, "Server error");
                    }
                    return Err(Error::from_response_parts(status, &body, retry_after));
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        if let Some(delay) =
                            self.inner.retry_policy.delay_for_attempt(attempt, None)
                        {
                            tracing::warn!(
                                error = %e,
                                attempt = attempt,
                                delay_ms = delay.as_millis(),
                                "Transport failure, retrying after delay"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    tracing::error!(error = %e, attempt = attempt, "Request failed");
                    return Err(Error::request_failed(e));
                }
            }
        }
    }

    /// Performs one API call and returns the live streaming response handle.
    ///
    /// The body is left unconsumed; the caller is responsible for reading it
    /// (typically via [`crate::download::save_response_to_dir`]).
    pub async fn stream(&self, request: ApiRequest) -> Result<reqwest::Response> {
        self.send(request).await
    }

    /// Performs one API call and parses the body as raw JSON.
    ///
    /// An empty body yields `serde_json::Value::Null`; any other JSON-legal
    /// value (object, array, scalar) is returned unchanged.
    pub async fn fetch_json(&self, request: ApiRequest) -> Result<serde_json::Value> {
        let response = self.send(request).await?;
        let status = response.status();
        let raw = response.text().await.map_err(Error::request_failed)?;

        if raw.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => Err(Error::unexpected_response(
                "a JSON document",
                status,
                e.to_string(),
                raw,
            )),
        }
    }

    /// Performs one API call and constructs a typed record from the JSON
    /// body.
    ///
    /// Any `DeserializeOwned` type works as a record; the client knows
    /// nothing about record internals beyond that capability. A body that
    /// does not match the record shape yields
    /// [`Error::UnexpectedResponse`] with the raw body preserved.
    pub async fn fetch<T>(&self, request: ApiRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;
        let status = response.status();
        let raw = response.text().await.map_err(Error::request_failed)?;

        match serde_json::from_str::<T>(&raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw,
                    "Failed to deserialize response into record type"
                );
                Err(Error::unexpected_response(
                    std::any::type_name::<T>(),
                    status,
                    e.to_string(),
                    raw,
                ))
            }
        }
    }

    /// Joins the effective base URL (per-request override wins) with the
    /// endpoint, avoiding double slashes.
    fn resolve_url(&self, request: &ApiRequest) -> Result<Url> {
        let base = request.base_url.as_deref().unwrap_or(&self.inner.base_url);
        let endpoint = request.endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{endpoint}"))?)
    }

    /// Dispatches a single request attempt.
    async fn execute(
        &self,
        request: &ApiRequest,
        url: Url,
        attempt: usize,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        tracing::debug!(
            method = %request.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        builder.send().await
    }
}

/// Builder for configuring and creating an [`OdpClient`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use uspto_odp::{OdpClient, RetryPolicy};
///
/// # fn example() -> Result<(), uspto_odp::Error> {
/// let client = OdpClient::builder()
///     .api_key("my-key")
///     .base_url("https://api.uspto.gov")
///     .timeout(Duration::from_secs(30))
///     .retry_policy(RetryPolicy {
///         max_retries: 5,
///         backoff_factor: 0.5,
///         ..RetryPolicy::default()
///     })
///     .build()?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
pub struct OdpClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl OdpClientBuilder {
    /// Creates a builder with default settings: no API key, the public ODP
    /// base URL, and the default retry policy.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            retry_policy: RetryPolicy::default(),
            timeout: None,
            pool_max_idle_per_host: None,
        }
    }

    /// Seeds the builder from `USPTO_API_KEY` and `USPTO_API_BASE_URL`.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        builder.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            builder.base_url = Some(base_url);
        }
        builder
    }

    /// Sets the API key, sent as the `X-API-KEY` header on every request.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL. A trailing slash is stripped.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the retry policy for transient failures.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Without one, a hung connection can block a call indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Caps the number of idle pooled connections kept per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Builds the configured [`OdpClient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for an unparsable base URL and
    /// [`Error::Configuration`] for an API key that is not a legal header
    /// value.
    pub fn build(self) -> Result<OdpClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Url::parse(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_owned();

        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key).map_err(|e| {
                Error::Configuration(format!("Invalid API key header value: {e}"))
            })?;
            headers.insert(API_KEY_HEADER, value);
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        let http_client = builder.build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(OdpClient {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                retry_policy: self.retry_policy,
            }),
        })
    }
}

impl Default for OdpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
