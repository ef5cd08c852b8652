//! Reviews, attributes and ordered photos.

use async_trait::async_trait;

use crate::domain::ports::StoreError;
use crate::domain::reviews::{Review, ReviewAttributes};
use crate::domain::{CafeId, ReviewId, UserId};

#[async_trait]
pub trait ReviewTx: Send {
    async fn find_review_for_update(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StoreError>;

    /// The caller's review of a café, whatever its status.
    async fn find_user_review_for_update(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<Review>, StoreError>;

    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError>;

    async fn update_review(&mut self, review: &Review) -> Result<(), StoreError>;

    async fn load_review_attributes(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<ReviewAttributes>, StoreError>;

    async fn upsert_review_attributes(
        &mut self,
        attributes: &ReviewAttributes,
    ) -> Result<(), StoreError>;

    async fn load_review_photos(&mut self, review_id: ReviewId) -> Result<Vec<String>, StoreError>;

    /// Replace the ordered photo list; positions follow slice order.
    async fn replace_review_photos(
        &mut self,
        review_id: ReviewId,
        photos: &[String],
    ) -> Result<(), StoreError>;

    /// Whether another published review by `user_id` has this fingerprint.
    async fn summary_fingerprint_taken(
        &mut self,
        user_id: UserId,
        fingerprint: &str,
        excluding: Option<ReviewId>,
    ) -> Result<bool, StoreError>;
}
