//! The `(scope, key)` claim, execute, complete sequence.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{IdempotentRequest, IdempotentResponse, MutationResponse, RequestHash, StoredIdempotency};
use crate::domain::Error;
use crate::domain::ports::{ReviewsStore, ReviewsTx, TxFuture, unit_of_work};

/// Decide what a request colliding with an existing slot gets back.
///
/// A different hash is a conflict, an unfinished slot is in progress, and
/// anything else replays the stored response.
pub fn resolve_existing(
    stored: &StoredIdempotency,
    request_hash: &RequestHash,
) -> Result<MutationResponse, Error> {
    if stored.request_hash != *request_hash {
        return Err(Error::idempotency_conflict(
            "idempotency key was already used with a different request",
        ));
    }
    if stored.is_in_flight() {
        return Err(Error::idempotency_in_progress(
            "a request with this idempotency key is still running",
        ));
    }
    let status = u16::try_from(stored.response_status)
        .map_err(|_| Error::internal("stored idempotent response has an invalid status"))?;
    Ok(MutationResponse {
        status,
        body: stored.response_body.clone(),
    })
}

/// Run `execute` at most once per `(scope, key)`.
///
/// The slot insert, the business writes and the slot completion share one
/// transaction. An error from `execute` rolls all of them back, leaving the
/// slot free for a later retry.
pub async fn run_idempotent<S, F>(
    store: &S,
    request: IdempotentRequest,
    now: DateTime<Utc>,
    execute: F,
) -> Result<IdempotentResponse, Error>
where
    S: ReviewsStore,
    F: for<'t> FnOnce(&'t mut dyn ReviewsTx) -> TxFuture<'t, MutationResponse> + Send + 'static,
{
    store
        .transaction(unit_of_work(move |tx| {
            Box::pin(async move {
                let IdempotentRequest {
                    scope,
                    key,
                    request_hash,
                } = request;

                let inserted = tx
                    .insert_idempotency_slot(&scope, &key, &request_hash, now)
                    .await?;
                if !inserted {
                    let stored = tx
                        .lock_idempotency_slot(&scope, &key)
                        .await?
                        .ok_or_else(|| Error::internal("idempotency slot vanished under lock"))?;
                    let response = resolve_existing(&stored, &request_hash)?;
                    debug!(scope = %scope, "replaying idempotent response");
                    return Ok(IdempotentResponse::replayed(response));
                }

                let response = execute(&mut *tx).await?;
                tx.complete_idempotency_slot(&scope, &key, &response, now)
                    .await?;
                Ok(IdempotentResponse::fresh(response))
            })
        }))
        .await
}
