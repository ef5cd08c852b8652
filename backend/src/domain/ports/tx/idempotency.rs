//! Idempotency slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::idempotency::{
    IdempotencyKey, IdempotencyScope, MutationResponse, RequestHash, StoredIdempotency,
};
use crate::domain::ports::StoreError;

#[async_trait]
pub trait IdempotencyTx: Send {
    /// Insert an in-flight slot (`response_status = 0`).
    ///
    /// Returns `false` when a slot for (scope, key) already exists.
    async fn insert_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        request_hash: &RequestHash,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Read an existing slot `FOR UPDATE`.
    async fn lock_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredIdempotency>, StoreError>;

    /// Record the final response on a slot this transaction inserted.
    async fn complete_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        response: &MutationResponse,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
