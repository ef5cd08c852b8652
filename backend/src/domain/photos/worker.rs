//! Asynchronous optimisation of confirmed uploads, and the sweep that
//! forgets old upload rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{info, warn};

use super::keys::final_object_key;
use super::model::{PhotoUpload, PhotoUploadStatus};
use super::optimise::OptimisationPolicy;
use crate::domain::background::BackgroundTask;
use crate::domain::events::{PhotoProcessing, truncate_error};
use crate::domain::ports::{ObjectStore, PhotoCodec, PhotoUploadRepository, ReadyPhoto};
use crate::domain::{Error, PhotoUploadId};

/// Longest error text stored on a failed upload.
pub const PHOTO_ERROR_MAX_CHARS: usize = 500;
/// Age after which a `processing` claim may be taken over.
pub const PHOTO_STUCK_LEASE_MINUTES: i64 = 10;

/// Fetch, optimise, re-upload and record one photo.
pub struct PhotoWorker {
    uploads: Arc<dyn PhotoUploadRepository>,
    objects: Arc<dyn ObjectStore>,
    codec: Arc<dyn PhotoCodec>,
    policy: OptimisationPolicy,
    clock: Arc<dyn Clock>,
}

impl PhotoWorker {
    pub fn new(
        uploads: Arc<dyn PhotoUploadRepository>,
        objects: Arc<dyn ObjectStore>,
        codec: Arc<dyn PhotoCodec>,
        policy: OptimisationPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uploads,
            objects,
            codec,
            policy,
            clock,
        }
    }

    /// Process `upload_id` unless another worker already finished it.
    ///
    /// Optimisation failures are recorded on the row and do not fail the
    /// caller; only datastore errors do.
    pub async fn process(&self, upload_id: PhotoUploadId) -> Result<(), Error> {
        let now = self.clock.utc();
        let stale_before = now - Duration::minutes(PHOTO_STUCK_LEASE_MINUTES);
        let Some(upload) = self
            .uploads
            .claim_for_processing(upload_id, now, stale_before)
            .await?
        else {
            info!(%upload_id, "photo upload not claimable; skipping");
            return Ok(());
        };

        match self.optimise(&upload).await {
            Ok(ready) => {
                self.uploads
                    .mark_ready(upload_id, &ready, self.clock.utc())
                    .await?;
                info!(
                    %upload_id,
                    final_object_key = %ready.final_object_key,
                    size_bytes = ready.size_bytes,
                    "photo optimised"
                );
            }
            Err(err) => {
                let message = truncate_error(&err.to_string(), PHOTO_ERROR_MAX_CHARS);
                warn!(%upload_id, error = %message, "photo optimisation failed");
                self.uploads
                    .mark_failed(upload_id, &message, self.clock.utc())
                    .await?;
            }
        }
        Ok(())
    }

    async fn optimise(&self, upload: &PhotoUpload) -> Result<ReadyPhoto, Error> {
        let source = self.objects.get(&upload.temp_object_key).await?;
        let codec = Arc::clone(&self.codec);
        let policy = self.policy;
        let optimised = tokio::task::spawn_blocking(move || codec.optimise(&source, &policy))
            .await
            .map_err(|err| Error::internal(format!("photo codec task failed: {err}")))??;

        let mime_type = optimised.format.mime_type();
        let final_key = final_object_key(
            upload.user_id,
            self.clock.utc().timestamp(),
            &optimised.bytes,
            optimised.format.extension(),
        );
        let size_bytes = i64::try_from(optimised.bytes.len())
            .map_err(|_| Error::internal("optimised photo is too large"))?;
        self.objects
            .put(&final_key, optimised.bytes, mime_type)
            .await?;
        if let Err(err) = self.objects.delete(&upload.temp_object_key).await {
            warn!(upload_id = %upload.id, error = %err, "temporary photo object not deleted");
        }
        Ok(ReadyPhoto {
            final_object_key: final_key,
            mime_type: mime_type.to_owned(),
            size_bytes,
        })
    }
}

#[async_trait]
impl PhotoProcessing for PhotoWorker {
    async fn process_upload(&self, upload_id: PhotoUploadId) -> Result<(), Error> {
        self.process(upload_id).await
    }
}

/// Retention for swept upload rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupRetention {
    /// `ready` and `failed` rows older than this are removed.
    pub finished: Duration,
    /// `pending` and `processing` rows older than this are removed.
    pub stuck: Duration,
}

impl Default for CleanupRetention {
    fn default() -> Self {
        Self {
            finished: Duration::days(3),
            stuck: Duration::hours(12),
        }
    }
}

/// Periodic sweep of old upload rows and their temporary objects.
pub struct PhotoCleanup {
    uploads: Arc<dyn PhotoUploadRepository>,
    objects: Arc<dyn ObjectStore>,
    retention: CleanupRetention,
    clock: Arc<dyn Clock>,
}

impl PhotoCleanup {
    pub fn new(
        uploads: Arc<dyn PhotoUploadRepository>,
        objects: Arc<dyn ObjectStore>,
        retention: CleanupRetention,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uploads,
            objects,
            retention,
            clock,
        }
    }

    /// Sweep once; returns the number of rows removed.
    ///
    /// Final objects of `ready` rows stay in place since reviews link them.
    pub async fn sweep(&self) -> Result<usize, Error> {
        let now = self.clock.utc();
        let swept = self
            .uploads
            .sweep(now - self.retention.finished, now - self.retention.stuck)
            .await?;
        for upload in &swept {
            if upload.status == PhotoUploadStatus::Ready {
                continue;
            }
            if let Err(err) = self.objects.delete(&upload.temp_object_key).await {
                warn!(upload_id = %upload.id, error = %err, "swept photo object not deleted");
            }
        }
        if !swept.is_empty() {
            info!(removed = swept.len(), "photo uploads swept");
        }
        Ok(swept.len())
    }
}

#[async_trait]
impl BackgroundTask for PhotoCleanup {
    fn name(&self) -> &'static str {
        "photo_cleanup"
    }

    async fn run_once(&self) -> Result<bool, Error> {
        self.sweep().await?;
        Ok(false)
    }
}
