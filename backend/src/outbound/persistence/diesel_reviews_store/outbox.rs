//! Transactional outbox enqueue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel_async::RunQueryDsl;

use crate::domain::events::NewDomainEvent;
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::OutboxTx;

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::{inserted, map_diesel_error};
use crate::outbound::persistence::models::NewOutboxRow;
use crate::outbound::persistence::schema::domain_events;

#[async_trait]
impl OutboxTx for DieselReviewsTx<'_> {
    async fn enqueue_event(
        &mut self,
        event: &NewDomainEvent,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        diesel::insert_into(domain_events::table)
            .values(NewOutboxRow::pending(event, now))
            .on_conflict(domain_events::dedupe_key)
            .do_nothing()
            .execute(self.conn())
            .await
            .map(inserted)
            .map_err(map_diesel_error)
    }
}
