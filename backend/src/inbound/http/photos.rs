//! Review photo upload handlers.
//!
//! ```text
//! POST /reviews/photos/presign
//! POST /reviews/photos/confirm
//! GET  /reviews/photos/{id}/status
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};

use crate::domain::PhotoUploadId;
use crate::domain::photos::{ConfirmPhotoRequest, PresignPhotoRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::idempotency::{
    IDEMPOTENT_REPLAY_HEADER, require_idempotency_key, respond,
};
use crate::inbound::http::identity::Identity;
use crate::inbound::http::schemas::{ConfirmPhotoSchema, ErrorSchema, PresignPhotoSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Issue a signed upload URL under the caller's temporary prefix.
///
/// Presigning writes nothing, so the idempotency key is validated but not
/// recorded and the response is never a replay.
#[utoipa::path(
    post,
    path = "/reviews/photos/presign",
    request_body = PresignPhotoSchema,
    params(("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")),
    responses(
        (status = 200, description = "Upload URL issued"),
        (status = 400, description = "Unsupported content type or size", body = ErrorSchema),
        (status = 503, description = "Object store disabled", body = ErrorSchema)
    ),
    tags = ["photos"],
    operation_id = "presignPhoto"
)]
#[post("/reviews/photos/presign")]
pub async fn presign_photo(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    payload: web::Json<PresignPhotoRequest>,
) -> ApiResult<HttpResponse> {
    require_idempotency_key(request.headers())?;
    let presigned = within(
        state.deadlines.default,
        "presign photo",
        state.photos.presign(identity.actor(), payload.into_inner()),
    )
    .await?;
    Ok(HttpResponse::Ok()
        .insert_header((IDEMPOTENT_REPLAY_HEADER, "false"))
        .json(presigned))
}

/// Register an uploaded object and queue its optimisation.
#[utoipa::path(
    post,
    path = "/reviews/photos/confirm",
    request_body = ConfirmPhotoSchema,
    params(("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")),
    responses(
        (status = 202, description = "Optimisation queued"),
        (status = 200, description = "Upload already confirmed"),
        (status = 400, description = "Key outside the caller's prefix or object missing", body = ErrorSchema),
        (status = 503, description = "Object store disabled", body = ErrorSchema)
    ),
    tags = ["photos"],
    operation_id = "confirmPhoto"
)]
#[post("/reviews/photos/confirm")]
pub async fn confirm_photo(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    payload: web::Json<ConfirmPhotoRequest>,
) -> ApiResult<HttpResponse> {
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "confirm photo",
        state
            .photos
            .confirm(identity.actor(), key, payload.into_inner()),
    )
    .await?;
    respond(response)
}

/// Upload state for its owner.
#[utoipa::path(
    get,
    path = "/reviews/photos/{id}/status",
    params(("id" = String, Path, description = "Photo upload id")),
    responses(
        (status = 200, description = "Current upload state"),
        (status = 404, description = "Upload not found or owned by another user", body = ErrorSchema)
    ),
    tags = ["photos"],
    operation_id = "photoStatus"
)]
#[get("/reviews/photos/{id}/status")]
pub async fn photo_status(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let upload_id: PhotoUploadId = parse_id(&path, FieldName::new("upload_id"))?;
    let view = within(
        state.deadlines.default,
        "photo status",
        state.photos.status(identity.actor(), upload_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(view))
}
