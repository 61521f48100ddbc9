//! Error types for USPTO Open Data Portal API calls.
//!
//! Every failure surfaces as one [`Error`] variant. HTTP error statuses are
//! mapped onto a fixed taxonomy by [`Error::from_response_parts`], which also
//! extracts the diagnostic detail string and request-correlation identifier
//! that the ODP APIs embed in their error payloads.

use std::time::Duration;

use http::StatusCode;

/// Candidate payload keys for the human-readable error detail, tried in order.
/// The ODP APIs are inconsistent about which one they use.
const DETAIL_KEYS: [&str; 2] = ["errorDetails", "detailedError"];

/// Payload key for the server-side request-correlation identifier.
const REQUEST_ID_KEY: &str = "requestIdentifier";

/// Diagnostic data shared by every API-level error variant.
///
/// The message always has the form `API Error {status}` with an optional
/// `: {detail}` suffix, or `Request failed: {cause}` for non-HTTP transport
/// failures (which carry no status code).
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The HTTP status code, absent for transport-level failures.
    pub status_code: Option<StatusCode>,
    /// Human-readable detail extracted from the error payload, when present.
    pub details: Option<String>,
    /// Opaque identifier correlating this request with server-side logs.
    pub request_identifier: Option<String>,
    message: String,
}

impl ApiError {
    /// Builds an `ApiError` for an HTTP error status, formatting the standard
    /// message from the status and optional detail.
    pub fn from_status(
        status: StatusCode,
        details: Option<String>,
        request_identifier: Option<String>,
    ) -> Self {
        let message = match &details {
            Some(detail) => format!("API Error {}: {detail}", status.as_u16()),
            None => format!("API Error {}", status.as_u16()),
        };
        Self {
            status_code: Some(status),
            details,
            request_identifier,
            message,
        }
    }

    /// Builds an `ApiError` for a failure below the HTTP layer (connection
    /// refused, DNS failure, timeout). No status code is available.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self {
            status_code: None,
            details: None,
            request_identifier: None,
            message: format!("Request failed: {cause}"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// The main error type for USPTO ODP API calls.
///
/// HTTP error statuses map onto the first six variants; everything else is
/// either a programming error caught before any network I/O
/// ([`Error::UnsupportedMethod`], [`Error::Configuration`]) or a local
/// post-processing failure ([`Error::UnexpectedResponse`], [`Error::Io`]).
///
/// # Examples
///
/// ```no_run
/// use uspto_odp::{ApiRequest, Error, OdpClient};
///
/// # async fn example(client: OdpClient) {
/// match client.fetch_json(ApiRequest::get("api/v1/datasets/products/search")).await {
///     Ok(value) => println!("{value}"),
///     Err(Error::NotFound(e)) => eprintln!("no such resource: {e}"),
///     Err(Error::RateLimit { error, retry_after }) => {
///         eprintln!("throttled ({error}), retry after {retry_after:?}");
///     }
///     Err(e) => eprintln!("request failed: {e}"),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request was malformed (HTTP 400).
    #[error("{0}")]
    BadRequest(ApiError),

    /// The API key is missing, invalid, or not authorized (HTTP 401/403).
    #[error("{0}")]
    Auth(ApiError),

    /// The requested resource does not exist (HTTP 404).
    #[error("{0}")]
    NotFound(ApiError),

    /// The request payload exceeded the API's size limit (HTTP 413).
    #[error("{0}")]
    PayloadTooLarge(ApiError),

    /// The request was throttled (HTTP 429).
    ///
    /// `retry_after` holds the delay the server asked for, when it sent a
    /// `Retry-After` header.
    #[error("{error}")]
    RateLimit {
        /// Diagnostic data for the throttled request.
        error: ApiError,
        /// Parsed `Retry-After` delay, if the server supplied one.
        retry_after: Option<Duration>,
    },

    /// The server failed to process the request (HTTP 5xx).
    #[error("{0}")]
    ServerError(ApiError),

    /// Any other HTTP error status, or a transport-level failure that never
    /// produced a status at all (`status_code` is `None` in that case).
    #[error("{error}")]
    Api {
        /// Diagnostic data for the failed request.
        error: ApiError,
        /// The underlying transport error, for non-HTTP failures.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The request descriptor used an HTTP method this client does not
    /// support. Raised before any network call and never retried.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(http::Method),

    /// A response body could not be turned into the shape the caller asked
    /// for. The raw body is preserved for debugging.
    #[error("Unexpected response shape (status {status}), expected {expected}: {detail}")]
    UnexpectedResponse {
        /// What the caller asked for (a type name or payload description).
        expected: &'static str,
        /// The HTTP status of the response that could not be handled.
        status: StatusCode,
        /// The parse error message.
        detail: String,
        /// The raw response body.
        raw_body: String,
    },

    /// An invalid URL was supplied for the base URL or an endpoint override.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The client was misconfigured (missing base URL, invalid header value).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filesystem failure while persisting a download.
    #[error("Download I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps an HTTP error response onto the typed taxonomy.
    ///
    /// This is pure: it never performs I/O and never fails. A body that is
    /// not valid JSON, or that lacks the known detail keys, simply produces an
    /// error without detail or correlation id.
    ///
    /// `retry_after` is the delay parsed from the response's `Retry-After`
    /// header, attached to [`Error::RateLimit`] so callers can honor it.
    pub fn from_response_parts(
        status: StatusCode,
        body: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        let (details, request_identifier) = extract_error_fields(body);
        let error = ApiError::from_status(status, details, request_identifier);

        match status.as_u16() {
            400 => Error::BadRequest(error),
            401 | 403 => Error::Auth(error),
            404 => Error::NotFound(error),
            413 => Error::PayloadTooLarge(error),
            429 => Error::RateLimit { error, retry_after },
            s if s >= 500 => Error::ServerError(error),
            _ => Error::Api {
                error,
                source: None,
            },
        }
    }

    /// Wraps a transport-level failure (no HTTP status) into the generic
    /// API error kind, prefixing the message with `Request failed: `.
    pub fn request_failed(source: reqwest::Error) -> Self {
        Error::Api {
            error: ApiError::transport(&source),
            source: Some(source),
        }
    }

    pub(crate) fn unexpected_response(
        expected: &'static str,
        status: StatusCode,
        detail: String,
        raw_body: String,
    ) -> Self {
        Error::UnexpectedResponse {
            expected,
            status,
            detail,
            raw_body,
        }
    }

    fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::BadRequest(e)
            | Error::Auth(e)
            | Error::NotFound(e)
            | Error::PayloadTooLarge(e)
            | Error::RateLimit { error: e, .. }
            | Error::ServerError(e)
            | Error::Api { error: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Returns the HTTP status code, when this error carries one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedResponse { status, .. } => Some(*status),
            _ => self.api_error().and_then(|e| e.status_code),
        }
    }

    /// Returns the detail string extracted from the API error payload.
    pub fn details(&self) -> Option<&str> {
        self.api_error().and_then(|e| e.details.as_deref())
    }

    /// Returns the request-correlation identifier from the error payload.
    pub fn request_identifier(&self) -> Option<&str> {
        self.api_error().and_then(|e| e.request_identifier.as_deref())
    }

    /// Returns the `Retry-After` delay for rate-limited requests.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if this error is transient: a rate limit, a server
    /// error, or a transport failure that never produced a status.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimit { .. } | Error::ServerError(_) => true,
            Error::Api { error, .. } => error.status_code.is_none(),
            _ => false,
        }
    }
}

/// Probes an error payload for the detail string and correlation identifier.
///
/// The detail keys are tried in order; the first non-empty string value wins.
/// A body that is not a JSON object yields `(None, None)`.
fn extract_error_fields(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, None);
    };

    let details = DETAIL_KEYS
        .iter()
        .find_map(|key| non_empty_string(value.get(key)));
    let request_identifier = non_empty_string(value.get(REQUEST_ID_KEY));

    (details, request_identifier)
}

fn non_empty_string(value: Option<&serde_json::Value>) -> Option<String> {
    value
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A specialized `Result` type for ODP API calls.
pub type Result<T> = std::result::Result<T, Error>;
