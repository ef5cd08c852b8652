//! Opaque offset cursors and the list envelope shared by paged endpoints.
//!
//! Clients never see raw offsets: the server hands out a `next_cursor`
//! string and accepts it back verbatim. Handlers resolve the query into
//! [`PageParams`], fetch `limit + 1` rows, and wrap them with
//! [`Paginated::from_rows`], which trims the probe row and mints the next
//! cursor.

mod cursor;
mod page;

pub use cursor::{CursorError, OffsetCursor};
pub use page::{DEFAULT_LIMIT, MAX_LIMIT, PageParams, Paginated, PaginationError};
