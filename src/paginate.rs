// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Cursor-following collection of paginated API results.
//!
//! GitHub's APIs hand back results a page at a time: the GraphQL API with an
//! opaque `endCursor`, the REST API with a page number. This module hides the
//! difference behind [`PageSource`] and drives either to completion with
//! [`collect_items`].
//!
//! The collection loop never over-fetches: once the requested item count is
//! satisfied, no further page is requested and excess items from the final
//! page are discarded. The first page failure aborts the whole operation.

/// Pagination position after a page has been fetched.
///
/// Once `has_more` is `false`, no further request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// Opaque continuation token for the next page, if any.
    pub token: Option<String>,
    /// Whether the API reports further pages.
    pub has_more: bool,
}

impl PageCursor {
    /// Cursor signalling that the listing is exhausted.
    #[must_use]
    pub const fn end() -> Self {
        Self {
            token: None,
            has_more: false,
        }
    }

    /// Cursor pointing at the next page.
    #[must_use]
    pub fn next(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            has_more: true,
        }
    }
}

/// One fetched page of items plus the position after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// The items on this page, in API order.
    pub items: Vec<T>,
    /// Position after this page.
    pub cursor: PageCursor,
}

/// A paginated listing that can be fetched one page at a time.
///
/// Implementations perform one network call per `fetch_page` invocation.
pub trait PageSource {
    /// The item type each page carries.
    type Item;
    /// The error a page fetch can fail with.
    type Error;

    /// Fetches the page identified by `token`, or the first page when
    /// `token` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the source's error for any failed page request; the caller
    /// aborts rather than retrying.
    fn fetch_page(&mut self, token: Option<&str>) -> Result<Page<Self::Item>, Self::Error>;
}

/// Collects items from `source` until `limit` is reached, the source reports
/// exhaustion, or a page request fails.
///
/// With `limit` of `None`, fetching continues until the source reports no
/// further pages. With a limit, the final page's excess items are discarded
/// and no request beyond the satisfying page is issued.
///
/// # Errors
///
/// Propagates the first page-fetch error. Items from pages already fetched
/// are dropped; there is no partial-success mode.
pub fn collect_items<S: PageSource>(
    source: &mut S,
    limit: Option<usize>,
) -> Result<Vec<S::Item>, S::Error> {
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    loop {
        if let Some(max) = limit {
            if items.len() >= max {
                items.truncate(max);
                return Ok(items);
            }
        }

        let page = source.fetch_page(token.as_deref())?;
        items.extend(page.items);

        if let Some(max) = limit {
            if items.len() >= max {
                items.truncate(max);
                return Ok(items);
            }
        }

        if !page.cursor.has_more {
            return Ok(items);
        }
        match page.cursor.token {
            Some(next) => token = Some(next),
            // A source claiming more pages without a token cannot advance.
            None => return Ok(items),
        }
    }
}
