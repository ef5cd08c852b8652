//! Photo upload state transitions driven by the worker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreError;
use crate::domain::photos::PhotoUpload;
use crate::domain::PhotoUploadId;

/// Final object details recorded on a `ready` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyPhoto {
    pub final_object_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoUploadRepository: Send + Sync {
    async fn find(&self, upload_id: PhotoUploadId) -> Result<Option<PhotoUpload>, StoreError>;

    /// Move a `pending` row (or a `processing` row older than
    /// `stale_before`) to `processing`.
    async fn claim_for_processing(
        &self,
        upload_id: PhotoUploadId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<PhotoUpload>, StoreError>;

    async fn mark_ready(
        &self,
        upload_id: PhotoUploadId,
        ready: &ReadyPhoto,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn mark_failed(
        &self,
        upload_id: PhotoUploadId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete `ready|failed` rows updated before `finished_before` and
    /// `pending|processing` rows updated before `stuck_before`.
    async fn sweep(
        &self,
        finished_before: DateTime<Utc>,
        stuck_before: DateTime<Utc>,
    ) -> Result<Vec<PhotoUpload>, StoreError>;
}
