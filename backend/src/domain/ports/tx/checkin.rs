//! Check-ins and visit verifications.

use async_trait::async_trait;

use crate::domain::checkins::{CheckIn, VisitVerification};
use crate::domain::ports::StoreError;
use crate::domain::{CafeId, CheckInId, ReviewId, UserId};

#[async_trait]
pub trait CheckInTx: Send {
    /// Active `started` check-in for (user, café).
    async fn find_started_checkin(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<CheckIn>, StoreError>;

    /// Most recent check-in of the user at any café.
    async fn latest_checkin(&mut self, user_id: UserId) -> Result<Option<CheckIn>, StoreError>;

    async fn insert_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError>;

    async fn lock_checkin(&mut self, checkin_id: CheckInId)
    -> Result<Option<CheckIn>, StoreError>;

    async fn update_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError>;

    async fn find_visit_verification(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<VisitVerification>, StoreError>;

    /// Insert or replace the single verification of a review.
    async fn upsert_visit_verification(
        &mut self,
        verification: &VisitVerification,
    ) -> Result<(), StoreError>;
}
