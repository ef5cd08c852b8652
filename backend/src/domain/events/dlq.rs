//! Operator access to dead-lettered inbox rows.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use super::model::{DlqEntry, ReplayOutcome};
use crate::domain::ports::{DlqQuery, EventStore};
use crate::domain::{DlqId, Error};

/// Default page size for DLQ listings.
pub const DLQ_DEFAULT_LIMIT: u32 = 50;
/// Largest page an operator may request.
pub const DLQ_MAX_LIMIT: u32 = 500;

pub struct DlqAdmin {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl DlqAdmin {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// List DLQ rows, newest first. Limits are clamped to `1..=500`.
    pub async fn list(
        &self,
        include_resolved: bool,
        limit: Option<u32>,
        offset: Option<u64>,
    ) -> Result<Vec<DlqEntry>, Error> {
        let query = DlqQuery {
            include_resolved,
            limit: limit.unwrap_or(DLQ_DEFAULT_LIMIT).clamp(1, DLQ_MAX_LIMIT),
            offset: offset.unwrap_or(0),
        };
        Ok(self.store.list_dlq(query).await?)
    }

    /// Re-arm the inbox row behind a DLQ entry.
    pub async fn replay(&self, dlq_id: DlqId) -> Result<ReplayOutcome, Error> {
        let outcome = self
            .store
            .replay_dlq(dlq_id, self.clock.utc())
            .await?
            .ok_or_else(|| Error::not_found(format!("dlq entry {dlq_id} not found")))?;
        info!(%dlq_id, inbox_id = %outcome.inbox_id, mode = ?outcome.mode, "dlq entry replayed");
        Ok(outcome)
    }
}
