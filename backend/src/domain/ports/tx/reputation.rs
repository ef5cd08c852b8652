//! Reputation ledger reads and penalty writes inside a transaction.

use async_trait::async_trait;

use crate::domain::ports::StoreError;
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};
use crate::domain::UserId;

#[async_trait]
pub trait ReputationTx: Send {
    async fn reputation_events(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<ReputationEvent>, StoreError>;

    /// Append unless (user, type, source) exists. Returns `true` on insert.
    async fn append_reputation_event(
        &mut self,
        event: &NewReputationEvent,
    ) -> Result<bool, StoreError>;
}
