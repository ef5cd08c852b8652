//! Outbox, inbox and DLQ over the shared tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::events::{
    DlqEntry, EventStatus, InboxEvent, OutboxEvent, ReplayMode, ReplayOutcome,
};
use crate::domain::ports::{DlqQuery, EventStore, StoreError};
use crate::domain::{DlqId, EventId, InboxId};

use super::MemoryDatabase;

fn claimable(
    status: EventStatus,
    available_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> bool {
    available_at <= now
        && (status == EventStatus::Pending
            || (status == EventStatus::Processing && updated_at < stale_before))
}

#[async_trait]
impl EventStore for MemoryDatabase {
    async fn claim_outbox(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<OutboxEvent>, StoreError> {
        let mut tables = self.lock().await;
        let candidate = tables
            .outbox
            .iter_mut()
            .filter(|event| {
                claimable(event.status, event.available_at, event.updated_at, now, stale_before)
            })
            .min_by_key(|event| (event.available_at, event.id));
        Ok(candidate.map(|event| {
            event.status = EventStatus::Processing;
            event.attempts += 1;
            event.updated_at = now;
            event.clone()
        }))
    }

    async fn fan_out(
        &self,
        event: &OutboxEvent,
        consumers: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        for consumer in consumers {
            let exists = tables
                .inbox
                .iter()
                .any(|row| row.outbox_event_id == event.id && &row.consumer == consumer);
            if exists {
                continue;
            }
            tables.inbox.push(InboxEvent {
                id: InboxId::random(),
                outbox_event_id: event.id,
                consumer: consumer.clone(),
                event_type: event.event_type.clone(),
                aggregate_id: event.aggregate_id,
                payload: event.payload.clone(),
                status: EventStatus::Pending,
                attempts: 0,
                available_at: now,
                last_error: None,
                created_at: now,
                updated_at: now,
            });
        }
        if let Some(stored) = tables.outbox.iter_mut().find(|row| row.id == event.id) {
            stored.status = EventStatus::Processed;
            stored.last_error = None;
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn retry_outbox(
        &self,
        event_id: EventId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(stored) = tables.outbox.iter_mut().find(|row| row.id == event_id) {
            stored.status = EventStatus::Pending;
            stored.available_at = available_at;
            stored.last_error = Some(error.to_owned());
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn fail_outbox(
        &self,
        event_id: EventId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(stored) = tables.outbox.iter_mut().find(|row| row.id == event_id) {
            stored.status = EventStatus::Failed;
            stored.last_error = Some(error.to_owned());
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn claim_inbox(
        &self,
        consumer: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<InboxEvent>, StoreError> {
        let mut tables = self.lock().await;
        let candidate = tables
            .inbox
            .iter_mut()
            .filter(|row| {
                row.consumer == consumer
                    && claimable(row.status, row.available_at, row.updated_at, now, stale_before)
            })
            .min_by_key(|row| (row.available_at, row.id));
        Ok(candidate.map(|row| {
            row.status = EventStatus::Processing;
            row.attempts += 1;
            row.updated_at = now;
            row.clone()
        }))
    }

    async fn complete_inbox(
        &self,
        inbox_id: InboxId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(stored) = tables.inbox.iter_mut().find(|row| row.id == inbox_id) {
            stored.status = EventStatus::Processed;
            stored.last_error = None;
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn retry_inbox(
        &self,
        inbox_id: InboxId,
        available_at: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(stored) = tables.inbox.iter_mut().find(|row| row.id == inbox_id) {
            stored.status = EventStatus::Pending;
            stored.available_at = available_at;
            stored.last_error = Some(error.to_owned());
            stored.updated_at = now;
        }
        Ok(())
    }

    async fn dead_letter_inbox(
        &self,
        inbox: &InboxEvent,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock().await;
        if let Some(stored) = tables.inbox.iter_mut().find(|row| row.id == inbox.id) {
            stored.status = EventStatus::Failed;
            stored.last_error = Some(error.to_owned());
            stored.updated_at = now;
        }
        let existing = tables.dlq.iter_mut().find(|entry| {
            entry.outbox_event_id == inbox.outbox_event_id && entry.consumer == inbox.consumer
        });
        match existing {
            Some(entry) => {
                entry.payload = inbox.payload.clone();
                entry.attempts = inbox.attempts;
                entry.last_error = Some(error.to_owned());
                entry.created_at = now;
                entry.resolved_at = None;
            }
            None => tables.dlq.push(DlqEntry {
                id: DlqId::random(),
                outbox_event_id: inbox.outbox_event_id,
                consumer: inbox.consumer.clone(),
                event_type: inbox.event_type.clone(),
                aggregate_id: inbox.aggregate_id,
                payload: inbox.payload.clone(),
                attempts: inbox.attempts,
                last_error: Some(error.to_owned()),
                created_at: now,
                resolved_at: None,
            }),
        }
        Ok(())
    }

    async fn list_dlq(&self, query: DlqQuery) -> Result<Vec<DlqEntry>, StoreError> {
        let offset = usize::try_from(query.offset)
            .map_err(|_| StoreError::query("DLQ offset out of range"))?;
        let limit = usize::try_from(query.limit)
            .map_err(|_| StoreError::query("DLQ limit out of range"))?;
        let tables = self.lock().await;
        let mut entries: Vec<DlqEntry> = tables
            .dlq
            .iter()
            .filter(|entry| query.include_resolved || entry.resolved_at.is_none())
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }

    async fn replay_dlq(
        &self,
        dlq_id: DlqId,
        now: DateTime<Utc>,
    ) -> Result<Option<ReplayOutcome>, StoreError> {
        let mut tables = self.lock().await;
        let Some(entry) = tables.dlq.iter().find(|entry| entry.id == dlq_id).cloned() else {
            return Ok(None);
        };

        let reset = tables.inbox.iter_mut().find(|row| {
            row.outbox_event_id == entry.outbox_event_id && row.consumer == entry.consumer
        });
        let (inbox_id, mode) = match reset {
            Some(row) => {
                row.status = EventStatus::Pending;
                row.attempts = 0;
                row.available_at = now;
                row.last_error = None;
                row.updated_at = now;
                (row.id, ReplayMode::ResetInbox)
            }
            None => {
                let id = InboxId::random();
                tables.inbox.push(InboxEvent {
                    id,
                    outbox_event_id: entry.outbox_event_id,
                    consumer: entry.consumer.clone(),
                    event_type: entry.event_type.clone(),
                    aggregate_id: entry.aggregate_id,
                    payload: entry.payload.clone(),
                    status: EventStatus::Pending,
                    attempts: 0,
                    available_at: now,
                    last_error: None,
                    created_at: now,
                    updated_at: now,
                });
                (id, ReplayMode::RecreatedInbox)
            }
        };

        if let Some(stored) = tables.dlq.iter_mut().find(|stored| stored.id == dlq_id) {
            stored.resolved_at = Some(now);
        }
        Ok(Some(ReplayOutcome {
            dlq_id,
            inbox_id,
            mode,
            resolved_at: now,
        }))
    }

    async fn find_outbox(&self, event_id: EventId) -> Result<Option<OutboxEvent>, StoreError> {
        let tables = self.lock().await;
        Ok(tables.outbox.iter().find(|row| row.id == event_id).cloned())
    }

    async fn inbox_for_event(&self, event_id: EventId) -> Result<Vec<InboxEvent>, StoreError> {
        let tables = self.lock().await;
        let mut rows: Vec<InboxEvent> = tables
            .inbox
            .iter()
            .filter(|row| row.outbox_event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.consumer.cmp(&b.consumer));
        Ok(rows)
    }
}

impl MemoryDatabase {
    /// Drop an inbox row, as an operator purge would.
    pub async fn delete_inbox(&self, inbox_id: InboxId) {
        self.lock().await.inbox.retain(|row| row.id != inbox_id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    async fn seed_inbox(db: &MemoryDatabase) -> InboxEvent {
        let row = InboxEvent {
            id: InboxId::random(),
            outbox_event_id: EventId::random(),
            consumer: "reviews_core".to_owned(),
            event_type: "review.created".to_owned(),
            aggregate_id: Uuid::new_v4(),
            payload: json!({}),
            status: EventStatus::Processing,
            attempts: 20,
            available_at: at(0),
            last_error: None,
            created_at: at(0),
            updated_at: at(0),
        };
        db.lock().await.inbox.push(row.clone());
        row
    }

    #[rstest]
    #[tokio::test]
    async fn dead_lettering_twice_reopens_the_same_entry() {
        let db = MemoryDatabase::new();
        let inbox = seed_inbox(&db).await;

        db.dead_letter_inbox(&inbox, "boom", at(1)).await.expect("dead letter");
        let first = db.dlq_entries().await;
        db.replay_dlq(first[0].id, at(2)).await.expect("replay");
        db.dead_letter_inbox(&inbox, "boom again", at(3))
            .await
            .expect("dead letter");

        let entries = db.dlq_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, first[0].id);
        assert_eq!(entries[0].resolved_at, None);
        assert_eq!(entries[0].last_error.as_deref(), Some("boom again"));
    }

    #[rstest]
    #[tokio::test]
    async fn stale_processing_rows_are_reclaimed() {
        let db = MemoryDatabase::new();
        let inbox = seed_inbox(&db).await;

        let fresh = db
            .claim_inbox("reviews_core", at(5), at(0))
            .await
            .expect("claim");
        assert!(fresh.is_none());

        let stale = db
            .claim_inbox("reviews_core", at(5), at(4))
            .await
            .expect("claim")
            .expect("stale row is claimable");
        assert_eq!(stale.id, inbox.id);
        assert_eq!(stale.attempts, 21);
    }
}
