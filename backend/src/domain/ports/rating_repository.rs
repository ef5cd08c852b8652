//! Snapshot inputs and snapshot persistence.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::rating::{CafeRatingInputs, RatingSnapshot};
use crate::domain::CafeId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError>;

    /// Published reviews of the café with their aggregates, plus the global
    /// mean rating.
    async fn load_inputs(&self, cafe_id: CafeId) -> Result<CafeRatingInputs, StoreError>;

    /// Insert or replace the café's snapshot.
    async fn upsert_snapshot(&self, snapshot: &RatingSnapshot) -> Result<(), StoreError>;

    async fn find_snapshot(&self, cafe_id: CafeId) -> Result<Option<RatingSnapshot>, StoreError>;

    /// Every café, for the periodic rebuild.
    async fn list_cafe_ids(&self) -> Result<Vec<CafeId>, StoreError>;
}
