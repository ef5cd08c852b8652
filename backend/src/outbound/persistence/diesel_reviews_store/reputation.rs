//! Reputation ledger reads and penalty writes inside a review transaction.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::UserId;
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::ReputationTx;
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::{inserted, map_diesel_error};
use crate::outbound::persistence::models::{
    NewReputationEventRow, ReputationEventRow, convert_rows,
};
use crate::outbound::persistence::schema::reputation_events;

/// Ledger rows for one user, oldest first.
pub(crate) async fn load_reputation_events(
    conn: &mut AsyncPgConnection,
    user_id: UserId,
) -> Result<Vec<ReputationEvent>, StoreError> {
    let rows: Vec<ReputationEventRow> = reputation_events::table
        .filter(reputation_events::user_id.eq(user_id.as_uuid()))
        .order_by((reputation_events::created_at.asc(), reputation_events::id.asc()))
        .select(ReputationEventRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;
    convert_rows(rows)
}

/// Append one ledger row; `false` when the source was already counted.
pub(crate) async fn append_reputation_event(
    conn: &mut AsyncPgConnection,
    event: &NewReputationEvent,
) -> Result<bool, StoreError> {
    diesel::insert_into(reputation_events::table)
        .values(NewReputationEventRow::from(event))
        .on_conflict((
            reputation_events::user_id,
            reputation_events::event_type,
            reputation_events::source_type,
            reputation_events::source_id,
        ))
        .do_nothing()
        .execute(conn)
        .await
        .map(inserted)
        .map_err(map_diesel_error)
}

#[async_trait]
impl ReputationTx for DieselReviewsTx<'_> {
    async fn reputation_events(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<ReputationEvent>, StoreError> {
        load_reputation_events(self.conn(), user_id).await
    }

    async fn append_reputation_event(
        &mut self,
        event: &NewReputationEvent,
    ) -> Result<bool, StoreError> {
        append_reputation_event(self.conn(), event).await
    }
}
