//! Pagination types and page-metadata calculation for list queries.
//!
//! These types implement Relay-style cursor pagination extended with
//! page-number navigation: alongside `hasNextPage`/`hasPreviousPage`, a
//! connection reports the current page number and a list of jump-to-page
//! descriptors.
//!
//! The cursor encodes a plain, re-derivable row offset into the ordered
//! result set. Repeated pagination of an unchanged data set is stable
//! (the ordering layer guarantees a total order), but the scheme is not
//! snapshot-isolated: rows inserted or deleted between page fetches can
//! shift window boundaries.

use crate::error::{DomainError, DomainResult};

/// Maximum number of jump-to-page descriptors in [`PageInfo::pages`].
///
/// Bounds response size for very large result sets; scalar page fields
/// stay exact beyond the cap.
pub const MAX_PAGE_LINKS: i64 = 200;

// =============================================================================
// Cursor
// =============================================================================

/// Opaque cursor for pagination.
///
/// The cursor value should be treated as an opaque token by clients. It
/// decodes to a zero-based row offset; an empty value decodes to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub value: String,
}

impl Cursor {
    /// Encode a row offset.
    pub fn from_offset(offset: i64) -> Self {
        Self {
            value: offset.to_string(),
        }
    }

    /// Decode to a row offset. Empty decodes to 0; anything that is not
    /// a non-negative integer is a validation error.
    pub fn to_offset(&self) -> DomainResult<i64> {
        if self.value.is_empty() {
            return Ok(0);
        }
        let offset: i64 = self
            .value
            .parse()
            .map_err(|_| DomainError::InvalidCursor(self.value.clone()))?;
        if offset < 0 {
            return Err(DomainError::InvalidCursor(self.value.clone()));
        }
        Ok(offset)
    }
}

/// Decode an optional request cursor; absent means offset 0.
pub fn decode_after(after: Option<&Cursor>) -> DomainResult<i64> {
    after.map(Cursor::to_offset).transpose().map(|o| o.unwrap_or(0))
}

// =============================================================================
// Page metadata
// =============================================================================

/// One jump-to-page descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub page_number: i64,
    /// Cursor positioning a query at the start of this page.
    pub after: Cursor,
    /// Whether the described page is the one being returned.
    pub is_current: bool,
    /// Total number of pages in the result set.
    pub page_count: i64,
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Whether there are more rows after this window.
    pub has_next_page: bool,
    /// Whether there are rows before this window.
    pub has_previous_page: bool,
    /// False when the requested offset lies beyond the result set.
    pub is_valid_page: bool,
    /// 1-based number of the page containing the window start.
    pub page_number: i64,
    /// Cursor for the next page, when there is one.
    pub next_page_after: Option<Cursor>,
    /// Jump-to-page descriptors, capped at [`MAX_PAGE_LINKS`].
    pub pages: Vec<Page>,
}

impl PageInfo {
    /// Compute page metadata for a window of `page_size` rows starting
    /// at `offset` into `total` matching rows.
    ///
    /// Pure function of its inputs. An offset that is not aligned to a
    /// page boundary is legal; `page_number` is the page containing the
    /// window start. An offset beyond `total` is out of range but not
    /// fatal: the caller returns an empty window and this reports
    /// `is_valid_page == false`.
    pub fn compute(total: i64, page_size: i64, offset: i64) -> Self {
        let page_size = page_size.max(1);
        let has_previous_page = offset > 0;
        let has_next_page = offset + page_size < total;
        let page_count = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        let page_number = (offset / page_size + 1).clamp(1, page_count.max(1));
        let next_page_after = if has_next_page {
            Some(Cursor::from_offset(offset + page_size))
        } else {
            None
        };
        let pages = (1..=page_count.min(MAX_PAGE_LINKS))
            .map(|number| Page {
                page_number: number,
                after: Cursor::from_offset((number - 1) * page_size),
                is_current: number == page_number,
                page_count,
            })
            .collect();

        Self {
            has_next_page,
            has_previous_page,
            is_valid_page: offset <= total,
            page_number,
            next_page_after,
            pages,
        }
    }
}

// =============================================================================
// Connections
// =============================================================================

/// A single item in a paginated result.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The actual item.
    pub node: T,
    /// Cursor addressing this item's absolute position.
    pub cursor: Cursor,
}

/// Paginated result set with edges, page info and the exact total count.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// Total number of rows matching the filter, across all pages.
    pub total_count: i64,
    /// The returned window, in the requested order.
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Assemble a connection from the ordered row window
    /// `[offset, offset + rows.len())` of a `total`-row result set.
    ///
    /// Performs no reordering; the rows must already be in the order the
    /// client requested. Each edge's cursor encodes the row's absolute
    /// offset, so any edge can seed a follow-up query.
    pub fn from_window(rows: Vec<T>, total: i64, page_size: i64, offset: i64) -> Self {
        let page_info = PageInfo::compute(total, page_size, offset);
        let edges = rows
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: Cursor::from_offset(offset + i as i64),
                node,
            })
            .collect();

        Self {
            total_count: total,
            edges,
            page_info,
        }
    }

    /// Map nodes into another type, preserving cursors and page info.
    ///
    /// This is the hook for entity-to-API-model mapping at the edge of
    /// the domain layer.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            total_count: self.total_count,
            edges: self
                .edges
                .into_iter()
                .map(|e| Edge {
                    node: f(e.node),
                    cursor: e.cursor,
                })
                .collect(),
            page_info: self.page_info,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
