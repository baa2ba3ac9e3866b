//! # Pagination
//!
//! Page-number pagination over a fully materialized result set.
//!
//! Pages are numbered from 1. A result set always has at least one page,
//! so an empty collection still answers page 1 with no results. The
//! literal `last` selects the final page.

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::core::{Filters, ViewsetError};

/// Default query parameter carrying the page number
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Page value selecting the final page
pub const LAST_PAGE: &str = "last";

/// Requested page falls outside the result set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("page '{requested}' is not in 1..={num_pages}")]
pub struct InvalidPage {
    /// Raw page value from the request
    pub requested: String,

    /// Pages available for this result set
    pub num_pages: usize,
}

impl From<InvalidPage> for ViewsetError {
    fn from(err: InvalidPage) -> Self {
        ViewsetError::InvalidPage(err.requested)
    }
}

/// Number of pages for `count` items, never less than one
pub fn num_pages(count: usize, page_size: NonZeroUsize) -> usize {
    count.div_ceil(page_size.get()).max(1)
}

/// Slice page `page` (1-based) out of `items`
pub fn paginate<T>(
    items: Vec<T>,
    page_size: NonZeroUsize,
    page: usize,
) -> Result<Vec<T>, InvalidPage> {
    let pages = num_pages(items.len(), page_size);
    if page == 0 || page > pages {
        return Err(InvalidPage {
            requested: page.to_string(),
            num_pages: pages,
        });
    }

    Ok(items
        .into_iter()
        .skip((page - 1) * page_size.get())
        .take(page_size.get())
        .collect())
}

/// Page-size policy bound to a viewset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: Option<NonZeroUsize>,
    page_param: String,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Paginator {
    /// `None` or `Some(0)` disables pagination
    pub fn new(page_size: Option<usize>) -> Self {
        Self {
            page_size: page_size.and_then(NonZeroUsize::new),
            page_param: DEFAULT_PAGE_PARAM.to_string(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Read the page number from `param` instead of `page`
    pub fn with_page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = param.into();
        self
    }

    pub fn page_size(&self) -> Option<usize> {
        self.page_size.map(NonZeroUsize::get)
    }

    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    pub fn is_enabled(&self) -> bool {
        self.page_size.is_some()
    }

    /// Return the requested page of `items`, or all of them when disabled
    pub fn paginate<T>(&self, items: Vec<T>, filters: &Filters) -> Result<Vec<T>, InvalidPage> {
        let Some(page_size) = self.page_size else {
            return Ok(items);
        };

        let pages = num_pages(items.len(), page_size);
        let page = resolve_page(filters.get(&self.page_param), pages)?;
        paginate(items, page_size, page)
    }
}

/// Translate the raw page parameter into a page number
fn resolve_page(raw: Option<&str>, pages: usize) -> Result<usize, InvalidPage> {
    // Absent and blank values both mean the first page
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(1);
    };

    if raw == LAST_PAGE {
        return Ok(pages);
    }

    raw.parse::<usize>().map_err(|_| InvalidPage {
        requested: raw.to_string(),
        num_pages: pages,
    })
}
