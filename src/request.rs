//! The per-call request descriptor.

use http::Method;

/// Describes one logical API call: method, endpoint, query parameters,
/// optional JSON body, and an optional base-URL override.
///
/// Descriptors are built fluently and consumed by the client:
///
/// ```
/// use uspto_odp::ApiRequest;
///
/// let request = ApiRequest::get("api/v1/datasets/products/search")
///     .with_query("q", "productTitle:patent")
///     .with_query("limit", "25");
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// The HTTP method. Only GET and POST are dispatched; anything else is
    /// rejected with [`crate::Error::UnsupportedMethod`].
    pub method: Method,

    /// Endpoint path relative to the base URL. A leading slash is tolerated
    /// and stripped when the full URL is assembled.
    pub endpoint: String,

    /// Query parameters, preserved in insertion order.
    pub query: Vec<(String, String)>,

    /// JSON body for POST requests.
    pub json_body: Option<serde_json::Value>,

    /// Overrides the client's base URL for this call. Used for documented
    /// endpoints that live under a different URL root, such as bulk file
    /// downloads.
    pub base_url: Option<String>,
}

impl ApiRequest {
    /// Creates a request descriptor with the given method and endpoint.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            json_body: None,
            base_url: None,
        }
    }

    /// Creates a GET request descriptor.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    /// Creates a POST request descriptor.
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends multiple query parameters.
    pub fn with_query_pairs(
        mut self,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attaches a JSON body. Only meaningful for POST requests.
    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }

    /// Overrides the base URL for this single call. A trailing slash is
    /// stripped, matching the client's own base-URL normalization.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = Some(base_url.as_ref().trim_end_matches('/').to_owned());
        self
    }
}
