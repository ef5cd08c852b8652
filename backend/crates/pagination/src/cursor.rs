//! Base64url-encoded offset cursor.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Errors raised while decoding a client-supplied cursor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    /// The cursor is not valid base64url.
    #[error("cursor is not valid base64url")]
    Encoding,
    /// The decoded bytes are not a cursor document.
    #[error("cursor payload is malformed")]
    Payload,
}

/// Position in a result set, as the number of rows already returned.
///
/// # Examples
/// ```
/// use pagination::OffsetCursor;
///
/// let cursor = OffsetCursor::new(40);
/// let decoded = OffsetCursor::decode(&cursor.encode()).expect("valid cursor");
/// assert_eq!(decoded.offset(), 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCursor {
    #[serde(rename = "o")]
    offset: u64,
}

impl OffsetCursor {
    /// Cursor pointing `offset` rows into the result set.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Opaque string handed to clients.
    #[must_use]
    pub fn encode(self) -> String {
        let document = format!("{{\"o\":{}}}", self.offset);
        URL_SAFE_NO_PAD.encode(document)
    }

    /// Parse a cursor previously produced by [`OffsetCursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when the text is not a cursor this crate
    /// minted.
    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|_| CursorError::Encoding)?;
        serde_json::from_slice(&bytes).map_err(|_| CursorError::Payload)
    }
}
