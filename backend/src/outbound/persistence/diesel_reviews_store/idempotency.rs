//! Idempotency slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;

use crate::domain::idempotency::{
    IN_FLIGHT_STATUS, IdempotencyKey, IdempotencyScope, MutationResponse, RequestHash,
    StoredIdempotency,
};
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::IdempotencyTx;

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::{inserted, map_diesel_error};
use crate::outbound::persistence::models::{IdempotencyRow, NewIdempotencyRow};
use crate::outbound::persistence::schema::idempotency_keys;

#[async_trait]
impl IdempotencyTx for DieselReviewsTx<'_> {
    async fn insert_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        request_hash: &RequestHash,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = NewIdempotencyRow {
            scope: scope.as_str(),
            key: key.as_ref(),
            request_hash: request_hash.to_hex(),
            response_status: IN_FLIGHT_STATUS,
            response_body: json!({}),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(idempotency_keys::table)
            .values(&row)
            .on_conflict((idempotency_keys::scope, idempotency_keys::key))
            .do_nothing()
            .execute(self.conn())
            .await
            .map(inserted)
            .map_err(map_diesel_error)
    }

    async fn lock_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredIdempotency>, StoreError> {
        let row: Option<IdempotencyRow> = idempotency_keys::table
            .filter(idempotency_keys::scope.eq(scope.as_str()))
            .filter(idempotency_keys::key.eq(key.as_ref()))
            .select(IdempotencyRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(StoredIdempotency::try_from).transpose()
    }

    async fn complete_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        response: &MutationResponse,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        diesel::update(
            idempotency_keys::table
                .filter(idempotency_keys::scope.eq(scope.as_str()))
                .filter(idempotency_keys::key.eq(key.as_ref())),
        )
        .set((
            idempotency_keys::response_status.eq(i32::from(response.status)),
            idempotency_keys::response_body.eq(&response.body),
            idempotency_keys::updated_at.eq(now),
        ))
        .execute(self.conn())
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }
}
