//! Page sizing and the response envelope.

use serde::Serialize;

use crate::cursor::{CursorError, OffsetCursor};

/// Page size when the client does not ask for one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page a client may request.
pub const MAX_LIMIT: u32 = 50;

/// Errors raised while resolving page parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The requested limit is zero.
    #[error("limit must be between 1 and {MAX_LIMIT}")]
    InvalidLimit,
    /// The cursor could not be decoded.
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Resolved limit and offset for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    limit: u32,
    offset: u64,
}

impl PageParams {
    /// Resolve the client's `limit` and `cursor` query parameters.
    ///
    /// Missing limits use [`DEFAULT_LIMIT`]; larger limits are capped at
    /// [`MAX_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] for a zero limit or a malformed cursor.
    ///
    /// # Examples
    /// ```
    /// use pagination::{MAX_LIMIT, PageParams};
    ///
    /// let params = PageParams::resolve(Some(500), None).expect("valid params");
    /// assert_eq!(params.limit(), MAX_LIMIT);
    /// assert_eq!(params.offset(), 0);
    /// ```
    pub fn resolve(limit: Option<u32>, cursor: Option<&str>) -> Result<Self, PaginationError> {
        let resolved_limit = match limit {
            None => DEFAULT_LIMIT,
            Some(0) => return Err(PaginationError::InvalidLimit),
            Some(requested) => requested.min(MAX_LIMIT),
        };
        let offset = cursor
            .filter(|raw| !raw.trim().is_empty())
            .map(OffsetCursor::decode)
            .transpose()?
            .map_or(0, OffsetCursor::offset);
        Ok(Self {
            limit: resolved_limit,
            offset,
        })
    }

    /// Rows to return.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Rows to fetch, one more than `limit` to detect a further page.
    #[must_use]
    pub const fn fetch_limit(self) -> u32 {
        self.limit.saturating_add(1)
    }
}

/// Body of a paged list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Page size used.
    pub limit: u32,
    /// Cursor for the following page, absent on the last one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// Wrap rows fetched with [`PageParams::fetch_limit`].
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageParams, Paginated};
    ///
    /// let params = PageParams::resolve(Some(2), None).expect("valid params");
    /// let page = Paginated::from_rows(vec![1, 2, 3], params);
    /// assert_eq!(page.data, vec![1, 2]);
    /// assert!(page.next_cursor.is_some());
    /// ```
    #[must_use]
    pub fn from_rows(mut rows: Vec<T>, params: PageParams) -> Self {
        let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            let next_offset = params.offset.saturating_add(u64::from(params.limit));
            Some(OffsetCursor::new(next_offset).encode())
        } else {
            None
        };
        Self {
            data: rows,
            limit: params.limit,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, DEFAULT_LIMIT)]
    #[case(Some(1), 1)]
    #[case(Some(MAX_LIMIT), MAX_LIMIT)]
    #[case(Some(MAX_LIMIT + 1), MAX_LIMIT)]
    fn limits_are_defaulted_and_capped(#[case] requested: Option<u32>, #[case] expected: u32) {
        let params = PageParams::resolve(requested, None);
        assert_eq!(params.map(PageParams::limit), Ok(expected));
    }

    #[rstest]
    fn zero_limit_is_rejected() {
        assert_eq!(
            PageParams::resolve(Some(0), None),
            Err(PaginationError::InvalidLimit)
        );
    }

    #[rstest]
    fn cursor_supplies_the_offset() {
        let cursor = OffsetCursor::new(20).encode();
        let params = PageParams::resolve(Some(20), Some(&cursor));
        assert_eq!(params.map(PageParams::offset), Ok(20));
    }

    #[rstest]
    fn blank_cursor_starts_at_the_beginning() {
        let params = PageParams::resolve(None, Some("  "));
        assert_eq!(params.map(PageParams::offset), Ok(0));
    }

    #[rstest]
    fn last_page_has_no_cursor() {
        let params = PageParams::resolve(Some(5), None).unwrap_or_else(|err| panic!("{err}"));
        let page = Paginated::from_rows(vec!['a', 'b'], params);
        assert_eq!(page.data.len(), 2);
        assert!(page.next_cursor.is_none());
    }

    #[rstest]
    fn next_cursor_advances_by_limit() {
        let first = OffsetCursor::new(10).encode();
        let params =
            PageParams::resolve(Some(2), Some(&first)).unwrap_or_else(|err| panic!("{err}"));
        let page = Paginated::from_rows(vec![1, 2, 3], params);
        let next = page
            .next_cursor
            .as_deref()
            .map(OffsetCursor::decode)
            .transpose();
        assert_eq!(next, Ok(Some(OffsetCursor::new(12))));
    }
}
