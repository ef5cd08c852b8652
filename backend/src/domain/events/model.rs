//! Outbox, inbox and dead-letter rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{DlqId, EventId, InboxId};

/// Business events flowing through the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "review.created")]
    ReviewCreated,
    #[serde(rename = "review.updated")]
    ReviewUpdated,
    #[serde(rename = "vote.helpful_added")]
    VoteHelpfulAdded,
    #[serde(rename = "visit.verified")]
    VisitVerified,
    #[serde(rename = "abuse.confirmed")]
    AbuseConfirmed,
    #[serde(rename = "review_photo.process_requested")]
    ReviewPhotoProcessRequested,
}

impl EventType {
    pub const ALL: [Self; 6] = [
        Self::ReviewCreated,
        Self::ReviewUpdated,
        Self::VoteHelpfulAdded,
        Self::VisitVerified,
        Self::AbuseConfirmed,
        Self::ReviewPhotoProcessRequested,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReviewCreated => "review.created",
            Self::ReviewUpdated => "review.updated",
            Self::VoteHelpfulAdded => "vote.helpful_added",
            Self::VisitVerified => "visit.verified",
            Self::AbuseConfirmed => "abuse.confirmed",
            Self::ReviewPhotoProcessRequested => "review_photo.process_requested",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for event type strings no handler knows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_owned()))
    }
}

/// Aggregate an event is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Cafe,
    User,
}

impl AggregateType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cafe => "cafe",
            Self::User => "user",
        }
    }
}

/// Status lattice shared by outbox and inbox rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for unknown stored statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event status: {0}")]
pub struct UnknownEventStatus(pub String);

impl FromStr for EventStatus {
    type Err = UnknownEventStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownEventStatus(other.to_owned())),
        }
    }
}

/// Event about to be enqueued inside a business transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDomainEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub dedupe_key: String,
    pub payload: Value,
}

/// Stored outbox row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxEvent {
    pub id: EventId,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub dedupe_key: String,
    pub payload: Value,
    pub status: EventStatus,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-consumer copy of an outbox event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboxEvent {
    pub id: InboxId,
    pub outbox_event_id: EventId,
    pub consumer: String,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub payload: Value,
    pub status: EventStatus,
    pub attempts: i32,
    pub available_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbox row that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DlqEntry {
    pub id: DlqId,
    pub outbox_event_id: EventId,
    pub consumer: String,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub payload: Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// How a DLQ replay re-armed the inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// The failed inbox row was reset to `pending`.
    ResetInbox,
    /// The inbox row was gone and has been recreated from the DLQ copy.
    RecreatedInbox,
}

/// Result of replaying one DLQ row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    pub dlq_id: DlqId,
    pub inbox_id: InboxId,
    pub mode: ReplayMode,
    pub resolved_at: DateTime<Utc>,
}
