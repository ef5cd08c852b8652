//! Presign, confirm and status for review photo uploads.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::keys::{extension_for, temp_object_key, temp_prefix};
use super::model::{PhotoUpload, PhotoUploadStatus};
use crate::domain::events::{EventBody, PhotoProcessRequested};
use crate::domain::idempotency::{
    IdempotencyKey, IdempotentRequest, IdempotentResponse, MutationResponse, ScopeKind,
    run_idempotent,
};
use crate::domain::ports::{ObjectStore, PhotoUploadRepository, ReviewsStore};
use crate::domain::{Actor, Error, PhotoUploadId};

/// Largest upload accepted, in bytes.
pub const MAX_UPLOAD_BYTES: i64 = 15 * 1024 * 1024;
/// Lifetime of a presigned upload URL.
pub const PRESIGN_TTL_MINUTES: i64 = 15;

/// Body of `POST /reviews/photos/presign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignPhotoRequest {
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignPhotoResponse {
    pub object_key: String,
    pub upload_url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub expires_at: DateTime<Utc>,
    pub max_size_bytes: i64,
}

/// Body of `POST /reviews/photos/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPhotoRequest {
    pub object_key: String,
}

/// Upload state as seen by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUploadView {
    pub upload_id: PhotoUploadId,
    pub status: PhotoUploadStatus,
    pub object_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn view(upload: &PhotoUpload, objects: &dyn ObjectStore) -> PhotoUploadView {
    PhotoUploadView {
        upload_id: upload.id,
        status: upload.status,
        object_key: upload.temp_object_key.clone(),
        final_object_key: upload.final_object_key.clone(),
        final_url: upload
            .final_object_key
            .as_deref()
            .and_then(|key| objects.public_url(key)),
        mime_type: upload.mime_type.clone(),
        size_bytes: upload.size_bytes,
        error: upload.error.clone(),
        updated_at: upload.updated_at,
    }
}

fn validate_size(size_bytes: i64) -> Result<(), Error> {
    if size_bytes <= 0 || size_bytes > MAX_UPLOAD_BYTES {
        return Err(Error::invalid_argument(format!(
            "size_bytes must be between 1 and {MAX_UPLOAD_BYTES}"
        ))
        .with_details(json!({ "field": "size_bytes", "max": MAX_UPLOAD_BYTES })));
    }
    Ok(())
}

/// Client-facing photo operations.
pub struct PhotoService<S> {
    store: Arc<S>,
    uploads: Arc<dyn PhotoUploadRepository>,
    objects: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl<S> PhotoService<S>
where
    S: ReviewsStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        uploads: Arc<dyn PhotoUploadRepository>,
        objects: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            uploads,
            objects,
            clock,
        }
    }

    /// Issue a temporary key and a signed upload URL for it.
    pub async fn presign(
        &self,
        actor: Actor,
        request: PresignPhotoRequest,
    ) -> Result<PresignPhotoResponse, Error> {
        let content_type = request.content_type.trim().to_ascii_lowercase();
        let extension = extension_for(&content_type).ok_or_else(|| {
            Error::invalid_argument(format!("unsupported content type: {content_type}"))
                .with_details(json!({ "field": "content_type" }))
        })?;
        validate_size(request.size_bytes)?;

        let object_key = temp_object_key(actor.user_id, Uuid::new_v4(), extension);
        let expires_at = self.clock.utc() + Duration::minutes(PRESIGN_TTL_MINUTES);
        let presigned = self
            .objects
            .presign_put(&object_key, &content_type, expires_at)
            .await?;
        info!(user_id = %actor.user_id, %object_key, "photo upload presigned");
        Ok(PresignPhotoResponse {
            object_key,
            upload_url: presigned.url,
            method: presigned.method,
            headers: presigned.headers.into_iter().collect(),
            expires_at: presigned.expires_at,
            max_size_bytes: MAX_UPLOAD_BYTES,
        })
    }

    /// Register an uploaded object and queue its optimisation.
    ///
    /// Responds `202` for a new upload and `200` when the key was already
    /// confirmed.
    pub async fn confirm(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: ConfirmPhotoRequest,
    ) -> Result<IdempotentResponse, Error> {
        let object_key = request.object_key.trim().to_owned();
        if !object_key.starts_with(&temp_prefix(actor.user_id)) || object_key.contains("..") {
            return Err(Error::forbidden("object key does not belong to the caller")
                .with_details(json!({ "field": "object_key" })));
        }
        let idempotent = IdempotentRequest::new(
            ScopeKind::PhotoConfirm,
            actor.user_id,
            key,
            &json!({ "object_key": &object_key }),
        )?;
        let now = self.clock.utc();
        let objects = Arc::clone(&self.objects);

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                if let Some(existing) = tx
                    .find_photo_upload_by_key(actor.user_id, &object_key)
                    .await?
                {
                    return MutationResponse::ok(&view(&existing, objects.as_ref()));
                }

                let head = objects.head(&object_key).await?.ok_or_else(|| {
                    Error::not_found(format!("object {object_key} has not been uploaded"))
                })?;
                validate_size(head.size_bytes)?;
                let mime_type = head
                    .content_type
                    .as_deref()
                    .map(|value| value.trim().to_ascii_lowercase())
                    .filter(|value| extension_for(value).is_some())
                    .or_else(|| mime_from_key(&object_key))
                    .ok_or_else(|| Error::invalid_argument("uploaded object is not a supported image"))?;

                let upload = PhotoUpload {
                    id: PhotoUploadId::random(),
                    user_id: actor.user_id,
                    temp_object_key: object_key,
                    status: PhotoUploadStatus::Pending,
                    final_object_key: None,
                    mime_type,
                    size_bytes: head.size_bytes,
                    error: None,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert_photo_upload(&upload).await?;
                let event = EventBody::PhotoProcessRequested(PhotoProcessRequested {
                    photo_upload_id: upload.id,
                    user_id: actor.user_id,
                })
                .into_event(format!("review-photo-process:{}", upload.id))?;
                tx.enqueue_event(&event, now).await?;
                info!(upload_id = %upload.id, user_id = %actor.user_id, "photo queued for optimisation");

                MutationResponse::new(202, &view(&upload, objects.as_ref()))
            })
        })
        .await
    }

    /// Current state of an upload; only its owner may look.
    pub async fn status(
        &self,
        actor: Actor,
        upload_id: PhotoUploadId,
    ) -> Result<PhotoUploadView, Error> {
        // Other users' uploads are reported as missing, not forbidden.
        let upload = self
            .uploads
            .find(upload_id)
            .await?
            .filter(|upload| upload.user_id == actor.user_id)
            .ok_or_else(|| Error::not_found(format!("photo upload {upload_id} not found")))?;
        Ok(view(&upload, self.objects.as_ref()))
    }
}

fn mime_from_key(object_key: &str) -> Option<String> {
    let extension = object_key.rsplit_once('.')?.1.to_ascii_lowercase();
    super::keys::ACCEPTED_MIME_TYPES
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| (*mime).to_owned())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(MAX_UPLOAD_BYTES, true)]
    #[case(MAX_UPLOAD_BYTES + 1, false)]
    fn upload_size_bounds(#[case] size: i64, #[case] ok: bool) {
        assert_eq!(validate_size(size).is_ok(), ok);
    }

    #[rstest]
    #[case("reviews/users/u/tmp/a.JPG", Some("image/jpeg"))]
    #[case("reviews/users/u/tmp/a.heic", Some("image/heic"))]
    #[case("reviews/users/u/tmp/a.gif", None)]
    #[case("reviews/users/u/tmp/noext", None)]
    fn mime_is_inferred_from_the_extension(#[case] key: &str, #[case] expected: Option<&str>) {
        assert_eq!(mime_from_key(key).as_deref(), expected);
    }
}
