//! PostgreSQL-backed [`ReputationRepository`] used by event handlers.

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::ports::{ReputationRepository, StoreError};
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};

use super::diesel_helpers::map_pool_error;
use super::diesel_reviews_store::{append_reputation_event, load_reputation_events};
use super::pool::DbPool;

/// Ledger access outside review transactions.
#[derive(Clone)]
pub struct DieselReputationRepository {
    pool: DbPool,
}

impl DieselReputationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReputationRepository for DieselReputationRepository {
    async fn append(&self, event: &NewReputationEvent) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        append_reputation_event(&mut conn, event).await
    }

    async fn events_for_user(&self, user_id: UserId) -> Result<Vec<ReputationEvent>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_reputation_events(&mut conn, user_id).await
    }
}
