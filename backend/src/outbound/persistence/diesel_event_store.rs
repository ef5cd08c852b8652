//! PostgreSQL-backed [`EventStore`].
//!
//! Claims pick the oldest eligible row with `FOR UPDATE SKIP LOCKED` and
//! flip it to `processing` in the same transaction, so concurrent
//! dispatchers never hold the same row. A `processing` row whose
//! `updated_at` is older than the stale cutoff is eligible again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::events::{
    DlqEntry, EventStatus, InboxEvent, OutboxEvent, ReplayMode, ReplayOutcome,
};
use crate::domain::ports::{DlqQuery, EventStore, StoreError};
use crate::domain::{DlqId, EventId, InboxId};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{
    DlqRow, InboxRow, NewDlqRow, NewInboxRow, OutboxRow, convert_rows,
};
use super::pool::DbPool;
use super::schema::{domain_event_dlq, domain_event_inbox, domain_events};

/// Diesel-backed outbox, inbox and DLQ.
#[derive(Clone)]
pub struct DieselEventStore {
    pool: DbPool,
}

impl DieselEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for DieselEventStore {
    async fn claim_outbox(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<OutboxEvent>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let claimed: Option<OutboxRow> = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let candidate: Option<Uuid> = domain_events::table
                        .filter(domain_events::available_at.le(now))
                        .filter(
                            domain_events::status.eq(EventStatus::Pending.as_str()).or(
                                domain_events::status
                                    .eq(EventStatus::Processing.as_str())
                                    .and(domain_events::updated_at.lt(stale_before)),
                            ),
                        )
                        .order_by((domain_events::available_at.asc(), domain_events::id.asc()))
                        .select(domain_events::id)
                        .limit(1)
                        .for_update()
                        .skip_locked()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(id) = candidate else {
                        return Ok(None);
                    };
                    diesel::update(domain_events::table.find(id))
                        .set((
                            domain_events::status.eq(EventStatus::Processing.as_str()),
                            domain_events::attempts.eq(domain_events::attempts + 1),
                            domain_events::updated_at.eq(now),
                        ))
                        .returning(OutboxRow::as_returning())
                        .get_result(conn)
                        .await
                        .map(Some)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        claimed.map(OutboxEvent::try_from).transpose()
    }

    async fn fan_out(
        &self,
        event: &OutboxEvent,
        consumers: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let rows: Vec<NewInboxRow<'_>> = consumers
            .iter()
            .map(|consumer| NewInboxRow {
                id: Uuid::new_v4(),
                outbox_event_id: *event.id.as_uuid(),
                consumer,
                event_type: &event.event_type,
                aggregate_id: event.aggregate_id,
                payload: &event.payload,
                status: EventStatus::Pending.as_str(),
                attempts: 0,
                available_at: now,
                created_at: now,
                updated_at: now,
            })
            .collect();
        let event_id = *event.id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                if !rows.is_empty() {
                    diesel::insert_into(domain_event_inbox::table)
                        .values(&rows)
                        .on_conflict((
                            domain_event_inbox::outbox_event_id,
                            domain_event_inbox::consumer,
                        ))
                        .do_nothing()
                        .execute(conn)
                        .await?;
                }
                diesel::update(domain_events::table.find(event_id))
                    .set((
                        domain_events::status.eq(EventStatus::Processed.as_str()),
                        domain_events::last_error.eq(None::<String>),
                        domain_events::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await
                    .map(|_| ())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn retry_outbox(
        &self,
        event_id: EventId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(domain_events::table.find(event_id.as_uuid()))
            .set((
                domain_events::status.eq(EventStatus::Pending.as_str()),
                domain_events::available_at.eq(available_at),
                domain_events::last_error.eq(error),
                domain_events::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn fail_outbox(
        &self,
        event_id: EventId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(domain_events::table.find(event_id.as_uuid()))
            .set((
                domain_events::status.eq(EventStatus::Failed.as_str()),
                domain_events::last_error.eq(error),
                domain_events::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn claim_inbox(
        &self,
        consumer: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<InboxEvent>, StoreError> {
        let consumer = consumer.to_owned();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let claimed: Option<InboxRow> = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let candidate: Option<Uuid> = domain_event_inbox::table
                        .filter(domain_event_inbox::consumer.eq(&consumer))
                        .filter(domain_event_inbox::available_at.le(now))
                        .filter(
                            domain_event_inbox::status
                                .eq(EventStatus::Pending.as_str())
                                .or(domain_event_inbox::status
                                    .eq(EventStatus::Processing.as_str())
                                    .and(domain_event_inbox::updated_at.lt(stale_before))),
                        )
                        .order_by((
                            domain_event_inbox::available_at.asc(),
                            domain_event_inbox::id.asc(),
                        ))
                        .select(domain_event_inbox::id)
                        .limit(1)
                        .for_update()
                        .skip_locked()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(id) = candidate else {
                        return Ok(None);
                    };
                    diesel::update(domain_event_inbox::table.find(id))
                        .set((
                            domain_event_inbox::status.eq(EventStatus::Processing.as_str()),
                            domain_event_inbox::attempts.eq(domain_event_inbox::attempts + 1),
                            domain_event_inbox::updated_at.eq(now),
                        ))
                        .returning(InboxRow::as_returning())
                        .get_result(conn)
                        .await
                        .map(Some)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        claimed.map(InboxEvent::try_from).transpose()
    }

    async fn complete_inbox(
        &self,
        inbox_id: InboxId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(domain_event_inbox::table.find(inbox_id.as_uuid()))
            .set((
                domain_event_inbox::status.eq(EventStatus::Processed.as_str()),
                domain_event_inbox::last_error.eq(None::<String>),
                domain_event_inbox::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn retry_inbox(
        &self,
        inbox_id: InboxId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(domain_event_inbox::table.find(inbox_id.as_uuid()))
            .set((
                domain_event_inbox::status.eq(EventStatus::Pending.as_str()),
                domain_event_inbox::available_at.eq(available_at),
                domain_event_inbox::last_error.eq(error),
                domain_event_inbox::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn dead_letter_inbox(
        &self,
        inbox: &InboxEvent,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let inbox_uuid = *inbox.id.as_uuid();
        let dlq_row = NewDlqRow {
            id: Uuid::new_v4(),
            outbox_event_id: *inbox.outbox_event_id.as_uuid(),
            consumer: &inbox.consumer,
            event_type: &inbox.event_type,
            aggregate_id: inbox.aggregate_id,
            payload: &inbox.payload,
            attempts: inbox.attempts,
            last_error: Some(error),
            created_at: now,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::update(domain_event_inbox::table.find(inbox_uuid))
                    .set((
                        domain_event_inbox::status.eq(EventStatus::Failed.as_str()),
                        domain_event_inbox::last_error.eq(error),
                        domain_event_inbox::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;
                diesel::insert_into(domain_event_dlq::table)
                    .values(&dlq_row)
                    .on_conflict((domain_event_dlq::outbox_event_id, domain_event_dlq::consumer))
                    .do_update()
                    .set((
                        domain_event_dlq::payload.eq(excluded(domain_event_dlq::payload)),
                        domain_event_dlq::attempts.eq(excluded(domain_event_dlq::attempts)),
                        domain_event_dlq::last_error.eq(excluded(domain_event_dlq::last_error)),
                        domain_event_dlq::created_at.eq(excluded(domain_event_dlq::created_at)),
                        domain_event_dlq::resolved_at.eq(None::<DateTime<Utc>>),
                    ))
                    .execute(conn)
                    .await
                    .map(|_| ())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn list_dlq(&self, query: DlqQuery) -> Result<Vec<DlqEntry>, StoreError> {
        let offset = i64::try_from(query.offset)
            .map_err(|_| StoreError::query("DLQ offset out of range"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut statement = domain_event_dlq::table
            .select(DlqRow::as_select())
            .order_by((domain_event_dlq::created_at.desc(), domain_event_dlq::id.asc()))
            .limit(i64::from(query.limit))
            .offset(offset)
            .into_boxed();
        if !query.include_resolved {
            statement = statement.filter(domain_event_dlq::resolved_at.is_null());
        }
        let rows: Vec<DlqRow> = statement
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(DlqEntry::from).collect())
    }

    async fn replay_dlq(
        &self,
        dlq_id: DlqId,
        now: DateTime<Utc>,
    ) -> Result<Option<ReplayOutcome>, StoreError> {
        let dlq_uuid = *dlq_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let entry: Option<DlqRow> = domain_event_dlq::table
                    .find(dlq_uuid)
                    .select(DlqRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let Some(entry) = entry else {
                    return Ok(None);
                };

                let reset = diesel::update(
                    domain_event_inbox::table
                        .filter(domain_event_inbox::outbox_event_id.eq(entry.outbox_event_id))
                        .filter(domain_event_inbox::consumer.eq(&entry.consumer)),
                )
                .set((
                    domain_event_inbox::status.eq(EventStatus::Pending.as_str()),
                    domain_event_inbox::attempts.eq(0),
                    domain_event_inbox::available_at.eq(now),
                    domain_event_inbox::last_error.eq(None::<String>),
                    domain_event_inbox::updated_at.eq(now),
                ))
                .returning(domain_event_inbox::id)
                .get_result::<Uuid>(conn)
                .await
                .optional()?;

                let (inbox_id, mode) = match reset {
                    Some(id) => (id, ReplayMode::ResetInbox),
                    None => {
                        let id = Uuid::new_v4();
                        diesel::insert_into(domain_event_inbox::table)
                            .values(NewInboxRow {
                                id,
                                outbox_event_id: entry.outbox_event_id,
                                consumer: &entry.consumer,
                                event_type: &entry.event_type,
                                aggregate_id: entry.aggregate_id,
                                payload: &entry.payload,
                                status: EventStatus::Pending.as_str(),
                                attempts: 0,
                                available_at: now,
                                created_at: now,
                                updated_at: now,
                            })
                            .execute(conn)
                            .await?;
                        (id, ReplayMode::RecreatedInbox)
                    }
                };

                diesel::update(domain_event_dlq::table.find(dlq_uuid))
                    .set(domain_event_dlq::resolved_at.eq(Some(now)))
                    .execute(conn)
                    .await?;
                debug!(dlq_id = %dlq_uuid, ?mode, "dead letter replayed");

                Ok(Some(ReplayOutcome {
                    dlq_id: DlqId::from_uuid(dlq_uuid),
                    inbox_id: InboxId::from_uuid(inbox_id),
                    mode,
                    resolved_at: now,
                }))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find_outbox(&self, event_id: EventId) -> Result<Option<OutboxEvent>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<OutboxRow> = domain_events::table
            .find(event_id.as_uuid())
            .select(OutboxRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(OutboxEvent::try_from).transpose()
    }

    async fn inbox_for_event(&self, event_id: EventId) -> Result<Vec<InboxEvent>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<InboxRow> = domain_event_inbox::table
            .filter(domain_event_inbox::outbox_event_id.eq(event_id.as_uuid()))
            .order_by(domain_event_inbox::consumer.asc())
            .select(InboxRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_rows(rows)
    }
}
