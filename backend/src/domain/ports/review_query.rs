//! Read-side listing of a café's reviews.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::reviews::{ReviewListItem, ReviewSort};
use crate::domain::CafeId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewQuery: Send + Sync {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError>;

    /// Published reviews ordered by `sort`, skipping `offset` rows.
    async fn list_cafe_reviews(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ReviewListItem>, StoreError>;
}
