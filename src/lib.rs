//! # uspto-odp - A client for the USPTO Open Data Portal API
//!
//! `uspto-odp` is a retry-aware, type-safe client for the USPTO Open Data
//! Portal REST API, built on top of `reqwest`. It provides a generic
//! request pipeline with structured error mapping, automatic retries with
//! exponential backoff, offset/limit pagination as a lazy stream, and
//! streaming file downloads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures_util::TryStreamExt;
//! use uspto_odp::bulk_data::BulkDataClient;
//! use uspto_odp::{OdpClient, PageCursor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), uspto_odp::Error> {
//!     // Reads USPTO_API_KEY (and optionally USPTO_API_BASE_URL) from the
//!     // environment.
//!     let client = BulkDataClient::new(OdpClient::from_env()?);
//!
//!     // Fetch one page of search results.
//!     let page = client.search_products("productTitle:patent").await?;
//!     println!("{} products on this page", page.count);
//!
//!     // Or stream every match across all pages.
//!     let mut products =
//!         std::pin::pin!(client.paginate_products("productTitle:patent", PageCursor::default()));
//!     while let Some(product) = products.try_next().await? {
//!         println!("{}: {}", product.product_identifier, product.product_title_text);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Generic request pipeline** - [`ApiRequest`] descriptors dispatched
//!   through one code path for every endpoint, with typed ([`OdpClient::fetch`]),
//!   untyped JSON ([`OdpClient::fetch_json`]), and streaming
//!   ([`OdpClient::stream`]) result shapes
//! - **Structured errors** - HTTP statuses mapped to an error taxonomy with
//!   the API's own error detail and request identifier extracted from the body
//! - **Automatic retries** - Exponential backoff on throttling and transient
//!   server errors, honoring `Retry-After`
//! - **Pagination as a stream** - [`paginate`] turns any page-fetching
//!   closure into a flat, lazy stream of items
//! - **Streaming downloads** - Response bodies written to disk in chunks,
//!   never buffered whole in memory
//! - **Automatic logging** - Structured logging with `tracing` for
//!   observability
//!
//! ## Error Handling
//!
//! Errors carry the HTTP status, the detail message the API embedded in the
//! body, and the API's request identifier when present:
//!
//! ```no_run
//! use uspto_odp::{ApiRequest, Error, OdpClient};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = OdpClient::builder().build()?;
//! match client.fetch_json(ApiRequest::get("api/v1/datasets/products/search")).await {
//!     Ok(body) => println!("{body}"),
//!     Err(Error::NotFound(e)) => eprintln!("no such resource: {e}"),
//!     Err(Error::RateLimit { error, retry_after }) => {
//!         eprintln!("throttled: {error} (retry after {retry_after:?})");
//!     }
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bulk_data;
mod client;
pub mod download;
mod error;
mod pagination;
mod request;
pub mod retry;

pub use client::{OdpClient, OdpClientBuilder, DEFAULT_BASE_URL};
pub use error::{ApiError, Error, Result};
pub use pagination::{paginate, Page, PageCursor, DEFAULT_PAGE_LIMIT};
pub use request::ApiRequest;
pub use retry::RetryPolicy;
