//! Outbox, inbox and dead-letter storage used by the dispatchers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreError;
use crate::domain::events::{DlqEntry, InboxEvent, OutboxEvent, ReplayOutcome};
use crate::domain::{DlqId, EventId, InboxId};

/// Filter for the admin DLQ listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlqQuery {
    pub include_resolved: bool,
    pub limit: u32,
    pub offset: u64,
}

/// Storage for the event pipeline.
///
/// Claims are single-row and atomic: a claimed row moves to `processing`
/// with `attempts` incremented, and rows locked by another dispatcher are
/// skipped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Claim the next due outbox row, reclaiming leases older than
    /// `stale_before`.
    async fn claim_outbox(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<OutboxEvent>, StoreError>;

    /// Insert one inbox row per consumer (duplicates ignored) and mark the
    /// outbox row `processed`, atomically.
    async fn fan_out(
        &self,
        event: &OutboxEvent,
        consumers: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Put an outbox row back to `pending` after a failed fan-out.
    async fn retry_outbox(
        &self,
        event_id: EventId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Give up on an outbox row.
    async fn fail_outbox(
        &self,
        event_id: EventId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Claim the next due inbox row for `consumer`.
    async fn claim_inbox(
        &self,
        consumer: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<InboxEvent>, StoreError>;

    /// Mark an inbox row `processed` and resolve any open DLQ row for it.
    async fn complete_inbox(&self, inbox_id: InboxId, now: DateTime<Utc>)
    -> Result<(), StoreError>;

    /// Put an inbox row back to `pending` with a backoff.
    async fn retry_inbox(
        &self,
        inbox_id: InboxId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Mark an inbox row `failed` and upsert its DLQ entry.
    async fn dead_letter_inbox(
        &self,
        inbox: &InboxEvent,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_dlq(&self, query: DlqQuery) -> Result<Vec<DlqEntry>, StoreError>;

    /// Re-arm the inbox from a DLQ row; `None` when the DLQ row is unknown.
    async fn replay_dlq(
        &self,
        dlq_id: DlqId,
        now: DateTime<Utc>,
    ) -> Result<Option<ReplayOutcome>, StoreError>;

    async fn find_outbox(&self, event_id: EventId) -> Result<Option<OutboxEvent>, StoreError>;

    async fn inbox_for_event(&self, event_id: EventId) -> Result<Vec<InboxEvent>, StoreError>;
}
