//! Idempotency envelope for review-core mutations.
//!
//! Every mutating operation runs inside [`run_idempotent`]: a durable
//! `(scope, key) -> (status, body)` slot is claimed in the same transaction
//! as the business writes, so a retried request either replays the stored
//! response or fails fast.
//!
//! - [`IdempotencyKey`]: opaque client key from the `Idempotency-Key` header.
//! - [`IdempotencyScope`]: mutation kind plus acting user.
//! - [`RequestHash`]: SHA-256 of the canonicalised request body.
//! - [`StoredIdempotency`]: slot as read back under lock.
//! - [`MutationResponse`]: status and body recorded on completion.

mod envelope;
mod key;
mod payload;
mod scope;

use serde::Serialize;
use serde_json::Value;

pub use envelope::{resolve_existing, run_idempotent};
pub use key::{IDEMPOTENCY_KEY_MAX_LEN, IdempotencyKey, IdempotencyKeyValidationError};
pub use payload::{RequestHash, RequestHashError, hash_request};
pub use scope::{IdempotencyScope, ScopeKind};

use crate::domain::{Error, UserId};

/// Status stored on a slot whose mutation has not committed yet.
pub const IN_FLIGHT_STATUS: i32 = 0;

/// Slot contents read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIdempotency {
    pub request_hash: RequestHash,
    pub response_status: i32,
    pub response_body: Value,
}

impl StoredIdempotency {
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.response_status == IN_FLIGHT_STATUS
    }
}

/// Final outcome of a mutation, recorded verbatim for replays.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResponse {
    pub status: u16,
    pub body: Value,
}

impl MutationResponse {
    /// Serialise `body` under `status`.
    pub fn new<T: Serialize>(status: u16, body: &T) -> Result<Self, Error> {
        let body = serde_json::to_value(body)
            .map_err(|err| Error::internal(format!("failed to serialise response: {err}")))?;
        Ok(Self { status, body })
    }

    pub fn ok<T: Serialize>(body: &T) -> Result<Self, Error> {
        Self::new(200, body)
    }

    pub fn created<T: Serialize>(body: &T) -> Result<Self, Error> {
        Self::new(201, body)
    }
}

/// Everything the envelope needs to claim a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotentRequest {
    pub scope: IdempotencyScope,
    pub key: IdempotencyKey,
    pub request_hash: RequestHash,
}

impl IdempotentRequest {
    /// Scope `kind` to `user_id` and hash `body`.
    pub fn new<T: Serialize>(
        kind: ScopeKind,
        user_id: UserId,
        key: IdempotencyKey,
        body: &T,
    ) -> Result<Self, Error> {
        let request_hash =
            hash_request(body).map_err(|err| Error::invalid_argument(err.to_string()))?;
        Ok(Self {
            scope: IdempotencyScope::new(kind, user_id),
            key,
            request_hash,
        })
    }
}

/// Response handed back to the caller, flagged when replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotentResponse {
    pub status: u16,
    pub body: Value,
    pub replayed: bool,
}

impl IdempotentResponse {
    #[must_use]
    pub fn fresh(response: MutationResponse) -> Self {
        Self {
            status: response.status,
            body: response.body,
            replayed: false,
        }
    }

    #[must_use]
    pub fn replayed(response: MutationResponse) -> Self {
        Self {
            status: response.status,
            body: response.body,
            replayed: true,
        }
    }
}

#[cfg(test)]
mod tests;
