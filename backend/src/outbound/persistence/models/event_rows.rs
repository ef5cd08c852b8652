//! Outbox, inbox and dead-letter rows.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::events::{DlqEntry, InboxEvent, NewDomainEvent, OutboxEvent};
use crate::domain::ports::StoreError;
use crate::domain::{DlqId, EventId, InboxId};

use super::super::diesel_helpers::parse_column;
use super::super::schema::{domain_event_dlq, domain_event_inbox, domain_events};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = domain_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OutboxRow {
    pub id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub dedupe_key: String,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OutboxRow> for OutboxEvent {
    type Error = StoreError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            event_type: row.event_type,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            dedupe_key: row.dedupe_key,
            payload: row.payload,
            status: parse_column(&row.status, "domain_events.status")?,
            attempts: row.attempts,
            available_at: row.available_at,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = domain_events)]
pub(crate) struct NewOutboxRow<'a> {
    pub id: Uuid,
    pub event_type: &'static str,
    pub aggregate_type: &'static str,
    pub aggregate_id: Uuid,
    pub dedupe_key: &'a str,
    pub payload: &'a Value,
    pub status: &'static str,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewOutboxRow<'a> {
    pub fn pending(event: &'a NewDomainEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: *event.id.as_uuid(),
            event_type: event.event_type.as_str(),
            aggregate_type: event.aggregate_type.as_str(),
            aggregate_id: event.aggregate_id,
            dedupe_key: &event.dedupe_key,
            payload: &event.payload,
            status: "pending",
            attempts: 0,
            available_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = domain_event_inbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InboxRow {
    pub id: Uuid,
    pub outbox_event_id: Uuid,
    pub consumer: String,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InboxRow> for InboxEvent {
    type Error = StoreError;

    fn try_from(row: InboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: InboxId::from_uuid(row.id),
            outbox_event_id: EventId::from_uuid(row.outbox_event_id),
            consumer: row.consumer,
            event_type: row.event_type,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            status: parse_column(&row.status, "domain_event_inbox.status")?,
            attempts: row.attempts,
            available_at: row.available_at,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = domain_event_inbox)]
pub(crate) struct NewInboxRow<'a> {
    pub id: Uuid,
    pub outbox_event_id: Uuid,
    pub consumer: &'a str,
    pub event_type: &'a str,
    pub aggregate_id: Uuid,
    pub payload: &'a Value,
    pub status: &'static str,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = domain_event_dlq)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DlqRow {
    pub id: Uuid,
    pub outbox_event_id: Uuid,
    pub consumer: String,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub payload: Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<DlqRow> for DlqEntry {
    fn from(row: DlqRow) -> Self {
        Self {
            id: DlqId::from_uuid(row.id),
            outbox_event_id: EventId::from_uuid(row.outbox_event_id),
            consumer: row.consumer,
            event_type: row.event_type,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = domain_event_dlq)]
pub(crate) struct NewDlqRow<'a> {
    pub id: Uuid,
    pub outbox_event_id: Uuid,
    pub consumer: &'a str,
    pub event_type: &'a str,
    pub aggregate_id: Uuid,
    pub payload: &'a Value,
    pub attempts: i32,
    pub last_error: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}
