//! Photo upload rows created on confirm.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::photos::PhotoUpload;
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::PhotoUploadTx;

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::map_diesel_error;
use crate::outbound::persistence::models::PhotoUploadRow;
use crate::outbound::persistence::schema::review_photo_uploads;

#[async_trait]
impl PhotoUploadTx for DieselReviewsTx<'_> {
    async fn find_photo_upload_by_key(
        &mut self,
        user_id: UserId,
        temp_object_key: &str,
    ) -> Result<Option<PhotoUpload>, StoreError> {
        let row: Option<PhotoUploadRow> = review_photo_uploads::table
            .filter(review_photo_uploads::user_id.eq(user_id.as_uuid()))
            .filter(review_photo_uploads::temp_object_key.eq(temp_object_key))
            .select(PhotoUploadRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(PhotoUpload::try_from).transpose()
    }

    async fn insert_photo_upload(&mut self, upload: &PhotoUpload) -> Result<(), StoreError> {
        diesel::insert_into(review_photo_uploads::table)
            .values(PhotoUploadRow::from(upload))
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
