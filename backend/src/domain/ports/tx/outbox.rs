//! Transactional outbox enqueue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::events::NewDomainEvent;
use crate::domain::ports::StoreError;

#[async_trait]
pub trait OutboxTx: Send {
    /// Enqueue as `pending`; a duplicate `dedupe_key` is silently ignored.
    ///
    /// Returns `true` when a row was inserted.
    async fn enqueue_event(
        &mut self,
        event: &NewDomainEvent,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
