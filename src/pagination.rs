//! Offset/limit pagination over multi-page search endpoints.
//!
//! Search endpoints return one page per call plus a `count` of how many items
//! that page holds. [`paginate`] turns a page-fetching closure into a single
//! flat, lazy stream of items, hiding the offset/limit bookkeeping.
//!
//! The end of data is signaled two ways: a page with `count == 0`, or a page
//! shorter than the requested limit. The short-page rule assumes the API only
//! returns a short page at the end of the result set; if an endpoint ever
//! returned a short page mid-sequence, iteration would stop there.

use std::future::Future;

use futures_util::stream::{self, Stream, TryStreamExt};

use crate::Result;

/// Default page size when the caller does not choose one.
pub const DEFAULT_PAGE_LIMIT: u64 = 25;

/// One page of a paginated response.
///
/// This is the contract a search method's return type must satisfy to be
/// driven by [`paginate`]: report how many items the page holds and yield
/// them in API order.
pub trait Page {
    /// The item type held by the page's container field.
    type Item;

    /// Number of items in this page, as reported by the API.
    fn count(&self) -> u64;

    /// Consumes the page, yielding its items in the order the API returned
    /// them.
    fn into_items(self) -> Vec<Self::Item>;
}

/// The offset/limit position of one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Starting position of the page.
    pub offset: u64,
    /// Requested page size.
    pub limit: u64,
}

impl PageCursor {
    /// Creates a cursor. A zero limit is clamped to 1 so the cursor always
    /// advances.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.max(1),
        }
    }

    /// The cursor for the page after this one.
    fn advanced(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// Drives `fetch` over successive pages, yielding individual items.
///
/// `fetch` is called with a fresh cursor per page; any other search arguments
/// stay inside the closure, so restarting pagination is just calling
/// `paginate` again. The stream is lazy — nothing is fetched until polled —
/// and dropping it is cancellation, since no resources stay open between
/// pages. A fetch error ends the stream after yielding the error.
///
/// # Examples
///
/// ```no_run
/// use futures_util::TryStreamExt;
/// use uspto_odp::bulk_data::BulkDataClient;
/// use uspto_odp::{paginate, PageCursor};
///
/// # async fn example(client: BulkDataClient) -> Result<(), uspto_odp::Error> {
/// let mut products = std::pin::pin!(paginate(PageCursor::default(), |cursor| {
///     client.search_products_page("productTitle:patent", cursor)
/// }));
/// while let Some(product) = products.try_next().await? {
///     println!("{}", product.product_identifier);
/// }
/// # Ok(())
/// # }
/// ```
pub fn paginate<P, F, Fut>(start: PageCursor, fetch: F) -> impl Stream<Item = Result<P::Item>>
where
    P: Page,
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<P>>,
{
    stream::try_unfold((Some(start), fetch), |(state, mut fetch)| async move {
        let Some(cursor) = state else {
            return Ok::<_, crate::Error>(None);
        };

        let page = fetch(cursor).await?;
        let count = page.count();
        if count == 0 {
            return Ok(None);
        }

        // A short page is the last page; only a full page warrants another
        // fetch.
        let next = (count >= cursor.limit).then(|| cursor.advanced());
        let items = stream::iter(page.into_items().into_iter().map(Ok));
        Ok(Some((items, (next, fetch))))
    })
    .try_flatten()
}
