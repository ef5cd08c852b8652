//! Rating snapshot and photo upload rows.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::photos::PhotoUpload;
use crate::domain::ports::StoreError;
use crate::domain::rating::RatingSnapshot;
use crate::domain::{CafeId, PhotoUploadId, UserId};

use super::super::diesel_helpers::{count_from_db, count_to_db, parse_column};
use super::super::schema::{cafe_rating_snapshots, review_photo_uploads};

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = cafe_rating_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SnapshotRow {
    pub cafe_id: Uuid,
    pub formula_version: String,
    pub rating: f64,
    pub reviews_count: i32,
    pub verified_reviews_count: i32,
    pub fraud_risk: f64,
    pub components: Value,
    pub computed_at: DateTime<Utc>,
}

impl SnapshotRow {
    pub fn from_domain(snapshot: &RatingSnapshot) -> Result<Self, StoreError> {
        let components = serde_json::to_value(&snapshot.components)
            .map_err(|err| StoreError::query(format!("components: {err}")))?;
        Ok(Self {
            cafe_id: *snapshot.cafe_id.as_uuid(),
            formula_version: snapshot.formula_version.clone(),
            rating: snapshot.rating,
            reviews_count: count_to_db(snapshot.reviews_count, "reviews_count")?,
            verified_reviews_count: count_to_db(
                snapshot.verified_reviews_count,
                "verified_reviews_count",
            )?,
            fraud_risk: snapshot.fraud_risk,
            components,
            computed_at: snapshot.computed_at,
        })
    }
}

impl TryFrom<SnapshotRow> for RatingSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let components = serde_json::from_value(row.components)
            .map_err(|err| StoreError::corrupt(format!("cafe_rating_snapshots.components: {err}")))?;
        Ok(Self {
            cafe_id: CafeId::from_uuid(row.cafe_id),
            formula_version: row.formula_version,
            rating: row.rating,
            reviews_count: count_from_db(row.reviews_count, "reviews_count")?,
            verified_reviews_count: count_from_db(
                row.verified_reviews_count,
                "verified_reviews_count",
            )?,
            fraud_risk: row.fraud_risk,
            components,
            computed_at: row.computed_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = review_photo_uploads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PhotoUploadRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub temp_object_key: String,
    pub status: String,
    pub final_object_key: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PhotoUpload> for PhotoUploadRow {
    fn from(upload: &PhotoUpload) -> Self {
        Self {
            id: *upload.id.as_uuid(),
            user_id: *upload.user_id.as_uuid(),
            temp_object_key: upload.temp_object_key.clone(),
            status: upload.status.as_str().to_owned(),
            final_object_key: upload.final_object_key.clone(),
            mime_type: upload.mime_type.clone(),
            size_bytes: upload.size_bytes,
            error: upload.error.clone(),
            created_at: upload.created_at,
            updated_at: upload.updated_at,
        }
    }
}

impl TryFrom<PhotoUploadRow> for PhotoUpload {
    type Error = StoreError;

    fn try_from(row: PhotoUploadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PhotoUploadId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            temp_object_key: row.temp_object_key,
            status: parse_column(&row.status, "review_photo_uploads.status")?,
            final_object_key: row.final_object_key,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
