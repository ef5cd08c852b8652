//! Request hashing: canonical JSON, then SHA-256.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Failures while hashing a request payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestHashError {
    #[error("failed to serialise request payload: {message}")]
    Serialization { message: String },
    #[error("stored request hash is not 64 hex characters")]
    InvalidHex,
}

/// SHA-256 of a canonicalised request body.
///
/// Two requests reusing one idempotency key must carry equal hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHash([u8; 32]);

impl RequestHash {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse the lowercase hex form kept in `idempotency_keys.request_hash`.
    pub fn from_hex(raw: &str) -> Result<Self, RequestHashError> {
        let bytes = hex::decode(raw).map_err(|_| RequestHashError::InvalidHex)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| RequestHashError::InvalidHex)?;
        Ok(Self(array))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RequestHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash any serialisable request after canonicalising it.
///
/// Object keys are sorted recursively, arrays keep their order, and the
/// compact JSON bytes are digested, so key order and whitespace never
/// change the hash.
///
/// # Examples
/// ```
/// use backend::domain::idempotency::hash_request;
/// use serde_json::json;
///
/// let a = hash_request(&json!({"b": 2, "a": 1})).expect("hash a");
/// let b = hash_request(&json!({"a": 1, "b": 2})).expect("hash b");
/// assert_eq!(a, b);
/// ```
pub fn hash_request<T: Serialize>(request: &T) -> Result<RequestHash, RequestHashError> {
    let value = serde_json::to_value(request).map_err(|err| RequestHashError::Serialization {
        message: err.to_string(),
    })?;
    let bytes = serde_json::to_vec(&canonicalize(&value)).map_err(|err| {
        RequestHashError::Serialization {
            message: err.to_string(),
        }
    })?;
    Ok(RequestHash(Sha256::digest(&bytes).into()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, nested)| (key.clone(), canonicalize(nested)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
