//! Check-ins and visit verifications.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::checkins::{CheckIn, CheckInStatus, VisitVerification};
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::CheckInTx;
use crate::domain::{CafeId, CheckInId, ReviewId, UserId};

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::map_diesel_error;
use crate::outbound::persistence::models::{CheckInRow, VisitVerificationRow};
use crate::outbound::persistence::schema::{review_checkins, visit_verifications};

#[async_trait]
impl CheckInTx for DieselReviewsTx<'_> {
    async fn find_started_checkin(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<CheckIn>, StoreError> {
        let row: Option<CheckInRow> = review_checkins::table
            .filter(review_checkins::user_id.eq(user_id.as_uuid()))
            .filter(review_checkins::cafe_id.eq(cafe_id.as_uuid()))
            .filter(review_checkins::status.eq(CheckInStatus::Started.as_str()))
            .order_by(review_checkins::started_at.desc())
            .select(CheckInRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(CheckIn::try_from).transpose()
    }

    async fn latest_checkin(&mut self, user_id: UserId) -> Result<Option<CheckIn>, StoreError> {
        let row: Option<CheckInRow> = review_checkins::table
            .filter(review_checkins::user_id.eq(user_id.as_uuid()))
            .order_by(review_checkins::started_at.desc())
            .select(CheckInRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(CheckIn::try_from).transpose()
    }

    async fn insert_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError> {
        diesel::insert_into(review_checkins::table)
            .values(CheckInRow::from(checkin))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn lock_checkin(
        &mut self,
        checkin_id: CheckInId,
    ) -> Result<Option<CheckIn>, StoreError> {
        let row: Option<CheckInRow> = review_checkins::table
            .find(checkin_id.as_uuid())
            .select(CheckInRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(CheckIn::try_from).transpose()
    }

    async fn update_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError> {
        let row = CheckInRow::from(checkin);
        diesel::update(review_checkins::table.find(checkin.id.as_uuid()))
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_visit_verification(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<VisitVerification>, StoreError> {
        let row: Option<VisitVerificationRow> = visit_verifications::table
            .filter(visit_verifications::review_id.eq(review_id.as_uuid()))
            .select(VisitVerificationRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(VisitVerification::try_from).transpose()
    }

    async fn upsert_visit_verification(
        &mut self,
        verification: &VisitVerification,
    ) -> Result<(), StoreError> {
        diesel::insert_into(visit_verifications::table)
            .values(VisitVerificationRow::from(verification))
            .on_conflict(visit_verifications::review_id)
            .do_update()
            .set((
                visit_verifications::confidence.eq(excluded(visit_verifications::confidence)),
                visit_verifications::verified_at.eq(excluded(visit_verifications::verified_at)),
                visit_verifications::dwell_seconds
                    .eq(excluded(visit_verifications::dwell_seconds)),
            ))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
