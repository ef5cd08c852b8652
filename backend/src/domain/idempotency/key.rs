//! Client-supplied idempotency keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest key accepted from clients.
pub const IDEMPOTENCY_KEY_MAX_LEN: usize = 255;

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyValidationError {
    #[error("idempotency key must not be empty")]
    EmptyKey,
    #[error("idempotency key must be at most {max} characters")]
    TooLong { max: usize },
    #[error("idempotency key must not contain control characters")]
    ControlCharacters,
}

/// Opaque key chosen by the client to deduplicate a mutation.
///
/// Surrounding whitespace is trimmed; the remaining text is stored verbatim.
///
/// # Examples
/// ```
/// use backend::domain::idempotency::IdempotencyKey;
///
/// let key = IdempotencyKey::new("  publish-42 ").expect("valid key");
/// assert_eq!(key.as_ref(), "publish-42");
/// assert!(IdempotencyKey::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self, IdempotencyKeyValidationError> {
        let trimmed = key.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if trimmed.chars().count() > IDEMPOTENCY_KEY_MAX_LEN {
            return Err(IdempotencyKeyValidationError::TooLong {
                max: IDEMPOTENCY_KEY_MAX_LEN,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(IdempotencyKeyValidationError::ControlCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
