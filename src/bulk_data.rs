//! Client for the bulk dataset products API.
//!
//! This wraps [`OdpClient`] with typed records and endpoint knowledge for the
//! `api/v1/datasets/products` family: searching products, fetching a single
//! product by identifier, and downloading product files.

use std::path::{Path, PathBuf};

use futures_util::Stream;
use serde::Deserialize;
use url::Url;

use crate::download::save_response_to_dir;
use crate::pagination::{paginate, Page, PageCursor};
use crate::{ApiRequest, OdpClient, Result};

const PRODUCTS_SEARCH_ENDPOINT: &str = "api/v1/datasets/products/search";
const PRODUCT_BY_ID_ENDPOINT: &str = "api/v1/datasets/products";

/// One page of product search results.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDataResponse {
    /// Number of products in this page.
    pub count: u64,
    /// The products themselves. Absent in some zero-count responses.
    #[serde(rename = "bulkDataProductBag", default)]
    pub bulk_data_product_bag: Vec<BulkDataProduct>,
}

impl Page for BulkDataResponse {
    type Item = BulkDataProduct;

    fn count(&self) -> u64 {
        self.count
    }

    fn into_items(self) -> Vec<BulkDataProduct> {
        self.bulk_data_product_bag
    }
}

/// A bulk data product: one downloadable dataset series.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkDataProduct {
    pub product_identifier: String,
    pub product_title_text: String,
    pub product_description_text: Option<String>,
    pub product_frequency_text: Option<String>,
    pub days_of_week_text: Option<String>,
    pub product_dataset_array_text: Option<String>,
    pub product_dataset_category_array_text: Option<String>,
    pub product_label_array_text: Option<String>,
    pub product_from_date: Option<String>,
    pub product_to_date: Option<String>,
    pub product_total_file_size: Option<u64>,
    pub product_file_total_quantity: Option<u64>,
    pub last_modified_date_time: Option<String>,
    pub mime_type_identifier_array_text: Option<String>,
    pub product_file_bag: Option<ProductFileBag>,
}

/// The files attached to a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFileBag {
    pub count: u64,
    pub file_data_bag: Vec<FileData>,
}

/// One downloadable file within a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileData {
    pub file_name: String,
    pub file_size: Option<u64>,
    pub file_data_from_date: Option<String>,
    pub file_data_to_date: Option<String>,
    pub file_type_text: Option<String>,
    pub file_release_date: Option<String>,
    #[serde(rename = "fileDownloadURI")]
    pub file_download_uri: Option<String>,
    pub file_date: Option<String>,
    pub file_last_modified_date_time: Option<String>,
}

/// Typed client for the bulk dataset products endpoints.
///
/// # Examples
///
/// ```no_run
/// use uspto_odp::bulk_data::BulkDataClient;
/// use uspto_odp::OdpClient;
///
/// # async fn example() -> Result<(), uspto_odp::Error> {
/// let client = BulkDataClient::new(OdpClient::builder().api_key("my-key").build()?);
/// let page = client.search_products("productTitle:patent").await?;
/// for product in &page.bulk_data_product_bag {
///     println!("{}: {}", product.product_identifier, product.product_title_text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BulkDataClient {
    client: OdpClient,
}

impl BulkDataClient {
    /// Wraps an already-configured [`OdpClient`].
    pub fn new(client: OdpClient) -> Self {
        Self { client }
    }

    /// Builds the client from `USPTO_API_KEY` and `USPTO_API_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(OdpClient::from_env()?))
    }

    /// The underlying generic client.
    pub fn inner(&self) -> &OdpClient {
        &self.client
    }

    /// Searches products, returning the first page with default paging.
    pub async fn search_products(&self, query: &str) -> Result<BulkDataResponse> {
        self.search_products_page(query, PageCursor::default()).await
    }

    /// Fetches one page of product search results.
    pub async fn search_products_page(
        &self,
        query: &str,
        cursor: PageCursor,
    ) -> Result<BulkDataResponse> {
        let mut request = ApiRequest::get(PRODUCTS_SEARCH_ENDPOINT)
            .with_query("offset", cursor.offset)
            .with_query("limit", cursor.limit);
        if !query.is_empty() {
            request = request.with_query("q", query);
        }
        self.client.fetch(request).await
    }

    /// Searches products via POST with a caller-assembled request body, for
    /// queries too elaborate for the `q` parameter (facets, filters, sort).
    pub async fn search_products_post(
        &self,
        body: serde_json::Value,
    ) -> Result<BulkDataResponse> {
        self.client
            .fetch(ApiRequest::post(PRODUCTS_SEARCH_ENDPOINT).with_json_body(body))
            .await
    }

    /// Fetches a single product by its identifier.
    pub async fn get_product_by_id(&self, product_id: &str) -> Result<BulkDataProduct> {
        self.client
            .fetch(ApiRequest::get(format!(
                "{PRODUCT_BY_ID_ENDPOINT}/{product_id}"
            )))
            .await
    }

    /// Streams every product matching `query` across all result pages.
    ///
    /// Pages are fetched lazily as the stream is polled; dropping the stream
    /// stops pagination.
    pub fn paginate_products<'a>(
        &'a self,
        query: &'a str,
        start: PageCursor,
    ) -> impl Stream<Item = Result<BulkDataProduct>> + 'a {
        paginate(start, move |cursor| {
            self.search_products_page(query, cursor)
        })
    }

    /// Downloads the file at `file_download_uri` into `destination`.
    ///
    /// Download URIs returned by the API are absolute and may live under a
    /// different host than the API itself, so the URI's own origin overrides
    /// the client's base URL for this call. The saved filename comes from the
    /// response's `Content-Disposition` header, falling back to the last path
    /// segment of the URI.
    ///
    /// Returns the path of the saved file.
    pub async fn download_file(
        &self,
        file_download_uri: &str,
        destination: &Path,
    ) -> Result<PathBuf> {
        let url = Url::parse(file_download_uri)?;
        let origin = url.origin().ascii_serialization();

        let mut endpoint = url.path().trim_start_matches('/').to_owned();
        if let Some(query) = url.query() {
            endpoint.push('?');
            endpoint.push_str(query);
        }

        let fallback = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("download")
            .to_owned();

        let response = self
            .client
            .stream(ApiRequest::get(endpoint).with_base_url(origin))
            .await?;
        save_response_to_dir(response, destination, &fallback).await
    }
}
