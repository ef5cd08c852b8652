//! Reviews, attributes and ordered photos.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::StoreError;
use crate::domain::ports::tx::ReviewTx;
use crate::domain::reviews::{Review, ReviewAttributes, ReviewStatus};
use crate::domain::{CafeId, ReviewId, UserId};

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::map_diesel_error;
use crate::outbound::persistence::models::{NewReviewPhotoRow, ReviewAttributesRow, ReviewRow};
use crate::outbound::persistence::schema::{review_attributes, review_photos, reviews};

#[async_trait]
impl ReviewTx for DieselReviewsTx<'_> {
    async fn find_review_for_update(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StoreError> {
        let row: Option<ReviewRow> = reviews::table
            .find(review_id.as_uuid())
            .select(ReviewRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Review::try_from).transpose()
    }

    async fn find_user_review_for_update(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<Review>, StoreError> {
        // Removed reviews are returned too: publishing again republishes them.
        let row: Option<ReviewRow> = reviews::table
            .filter(reviews::user_id.eq(user_id.as_uuid()))
            .filter(reviews::cafe_id.eq(cafe_id.as_uuid()))
            .order_by(reviews::updated_at.desc())
            .select(ReviewRow::as_select())
            .for_update()
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Review::try_from).transpose()
    }

    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError> {
        diesel::insert_into(reviews::table)
            .values(ReviewRow::from(review))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_review(&mut self, review: &Review) -> Result<(), StoreError> {
        let row = ReviewRow::from(review);
        diesel::update(reviews::table.find(review.id.as_uuid()))
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn load_review_attributes(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<ReviewAttributes>, StoreError> {
        let row: Option<ReviewAttributesRow> = review_attributes::table
            .find(review_id.as_uuid())
            .select(ReviewAttributesRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(ReviewAttributes::try_from).transpose()
    }

    async fn upsert_review_attributes(
        &mut self,
        attributes: &ReviewAttributes,
    ) -> Result<(), StoreError> {
        let row = ReviewAttributesRow::from_domain(attributes)?;
        diesel::insert_into(review_attributes::table)
            .values(&row)
            .on_conflict(review_attributes::review_id)
            .do_update()
            .set(&row)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn load_review_photos(&mut self, review_id: ReviewId) -> Result<Vec<String>, StoreError> {
        review_photos::table
            .filter(review_photos::review_id.eq(review_id.as_uuid()))
            .order_by(review_photos::position.asc())
            .select(review_photos::photo_url)
            .load(self.conn())
            .await
            .map_err(map_diesel_error)
    }

    async fn replace_review_photos(
        &mut self,
        review_id: ReviewId,
        photos: &[String],
    ) -> Result<(), StoreError> {
        let review_uuid = *review_id.as_uuid();
        diesel::delete(review_photos::table.filter(review_photos::review_id.eq(review_uuid)))
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        if photos.is_empty() {
            return Ok(());
        }
        let rows = photos
            .iter()
            .enumerate()
            .map(|(position, url)| {
                let position = i32::try_from(position)
                    .map_err(|_| StoreError::query("too many review photos"))?;
                Ok(NewReviewPhotoRow {
                    review_id: review_uuid,
                    position,
                    photo_url: url,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        diesel::insert_into(review_photos::table)
            .values(&rows)
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn summary_fingerprint_taken(
        &mut self,
        user_id: UserId,
        fingerprint: &str,
        excluding: Option<ReviewId>,
    ) -> Result<bool, StoreError> {
        let mut matches = reviews::table
            .inner_join(review_attributes::table)
            .filter(reviews::user_id.eq(*user_id.as_uuid()))
            .filter(reviews::status.eq(ReviewStatus::Published.as_str()))
            .filter(review_attributes::summary_fingerprint.eq(fingerprint))
            .select(reviews::id)
            .into_boxed();
        if let Some(excluded) = excluding {
            matches = matches.filter(reviews::id.ne(*excluded.as_uuid()));
        }
        diesel::select(exists(matches))
            .get_result(self.conn())
            .await
            .map_err(map_diesel_error)
    }
}
