//! Reputation ledger outside review transactions.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};
use crate::domain::UserId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationRepository: Send + Sync {
    /// Append unless (user, type, source) exists. Returns `true` on insert.
    async fn append(&self, event: &NewReputationEvent) -> Result<bool, StoreError>;

    async fn events_for_user(&self, user_id: UserId) -> Result<Vec<ReputationEvent>, StoreError>;
}
