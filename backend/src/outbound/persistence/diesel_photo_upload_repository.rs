//! PostgreSQL-backed [`PhotoUploadRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::PhotoUploadId;
use crate::domain::photos::{PhotoUpload, PhotoUploadStatus};
use crate::domain::ports::{PhotoUploadRepository, ReadyPhoto, StoreError};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{PhotoUploadRow, convert_rows};
use super::pool::DbPool;
use super::schema::review_photo_uploads;

/// Upload rows driven by the photo worker and cleanup loop.
#[derive(Clone)]
pub struct DieselPhotoUploadRepository {
    pool: DbPool,
}

impl DieselPhotoUploadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoUploadRepository for DieselPhotoUploadRepository {
    async fn find(&self, upload_id: PhotoUploadId) -> Result<Option<PhotoUpload>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PhotoUploadRow> = review_photo_uploads::table
            .find(upload_id.as_uuid())
            .select(PhotoUploadRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(PhotoUpload::try_from).transpose()
    }

    async fn claim_for_processing(
        &self,
        upload_id: PhotoUploadId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<PhotoUpload>, StoreError> {
        use review_photo_uploads::dsl as uploads;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let claimable = uploads::status.eq(PhotoUploadStatus::Pending.as_str()).or(uploads::status
            .eq(PhotoUploadStatus::Processing.as_str())
            .and(uploads::updated_at.lt(stale_before)));
        let row: Option<PhotoUploadRow> = diesel::update(
            uploads::review_photo_uploads
                .filter(uploads::id.eq(upload_id.as_uuid()))
                .filter(claimable),
        )
        .set((
            uploads::status.eq(PhotoUploadStatus::Processing.as_str()),
            uploads::updated_at.eq(now),
        ))
        .returning(PhotoUploadRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        row.map(PhotoUpload::try_from).transpose()
    }

    async fn mark_ready(
        &self,
        upload_id: PhotoUploadId,
        ready: &ReadyPhoto,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        use review_photo_uploads::dsl as uploads;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(uploads::review_photo_uploads.find(upload_id.as_uuid()))
            .set((
                uploads::status.eq(PhotoUploadStatus::Ready.as_str()),
                uploads::final_object_key.eq(Some(ready.final_object_key.as_str())),
                uploads::mime_type.eq(&ready.mime_type),
                uploads::size_bytes.eq(ready.size_bytes),
                uploads::error.eq(None::<String>),
                uploads::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn mark_failed(
        &self,
        upload_id: PhotoUploadId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        use review_photo_uploads::dsl as uploads;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(uploads::review_photo_uploads.find(upload_id.as_uuid()))
            .set((
                uploads::status.eq(PhotoUploadStatus::Failed.as_str()),
                uploads::error.eq(Some(error)),
                uploads::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn sweep(
        &self,
        finished_before: DateTime<Utc>,
        stuck_before: DateTime<Utc>,
    ) -> Result<Vec<PhotoUpload>, StoreError> {
        use review_photo_uploads::dsl as uploads;

        let finished = [
            PhotoUploadStatus::Ready.as_str(),
            PhotoUploadStatus::Failed.as_str(),
        ];
        let in_flight = [
            PhotoUploadStatus::Pending.as_str(),
            PhotoUploadStatus::Processing.as_str(),
        ];
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<PhotoUploadRow> = diesel::delete(
            uploads::review_photo_uploads.filter(
                uploads::status
                    .eq_any(finished)
                    .and(uploads::updated_at.lt(finished_before))
                    .or(uploads::status
                        .eq_any(in_flight)
                        .and(uploads::updated_at.lt(stuck_before))),
            ),
        )
        .returning(PhotoUploadRow::as_returning())
        .get_results(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        convert_rows(rows)
    }
}
