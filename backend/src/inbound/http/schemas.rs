//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their JSON shape and live in the inbound adapter
//! layer where framework concerns belong.
#![expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    #[schema(rename = "invalid_argument")]
    InvalidArgument,
    #[schema(rename = "unauthorized")]
    Unauthorized,
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    #[schema(rename = "conflict")]
    Conflict,
    /// Same idempotency key, different payload.
    #[schema(rename = "idempotency_conflict")]
    IdempotencyConflict,
    /// Same idempotency key, request still executing.
    #[schema(rename = "idempotency_in_progress")]
    IdempotencyInProgress,
    #[schema(rename = "too_many_requests")]
    TooManyRequests,
    #[schema(rename = "check_in_cooldown")]
    CheckInCooldown,
    #[schema(rename = "check_in_too_far")]
    CheckInTooFar,
    #[schema(rename = "check_in_suspicious")]
    CheckInSuspicious,
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal")]
    Internal,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
pub struct ErrorSchema {
    #[schema(example = "invalid_argument")]
    code: ErrorCodeSchema,
    #[schema(example = "summary must be at least 60 characters")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    trace_id: Option<String>,
    details: Option<serde_json::Value>,
}

/// Body of `POST /reviews`.
#[derive(ToSchema)]
#[schema(as = crate::domain::reviews::PublishReviewRequest)]
pub struct PublishReviewSchema {
    #[schema(format = "uuid")]
    cafe_id: String,
    #[schema(minimum = 1, maximum = 5)]
    rating: i64,
    #[schema(format = "uuid")]
    drink_id: Option<String>,
    #[schema(example = "espresso")]
    drink_name: Option<String>,
    /// Between 60 and 4000 characters after trimming.
    summary: String,
    taste_tags: Option<Vec<String>>,
    photos: Option<Vec<String>>,
}

/// Body of `PATCH /reviews/{id}`.
#[derive(ToSchema)]
#[schema(as = crate::domain::reviews::UpdateReviewRequest)]
pub struct UpdateReviewSchema {
    rating: Option<i64>,
    summary: Option<String>,
    #[schema(format = "uuid")]
    drink_id: Option<String>,
    drink_name: Option<String>,
    taste_tags: Option<Vec<String>>,
    photos: Option<Vec<String>>,
}

/// Body of `DELETE /reviews/{id}`.
#[derive(ToSchema)]
#[schema(as = crate::domain::reviews::RemoveReviewRequest)]
pub struct RemoveReviewSchema {
    reason: Option<String>,
}

/// Body of `POST /cafes/{id}/check-in/start`.
#[derive(ToSchema)]
#[schema(as = crate::domain::checkins::StartCheckInRequest)]
pub struct StartCheckInSchema {
    lat: f64,
    lng: f64,
}

/// Body of `POST /reviews/{id}/visit/verify`.
#[derive(ToSchema)]
#[schema(as = crate::domain::checkins::VerifyVisitRequest)]
pub struct VerifyVisitSchema {
    #[schema(format = "uuid")]
    checkin_id: String,
    lat: f64,
    lng: f64,
}

/// Body of `POST /reviews/{id}/abuse`.
#[derive(ToSchema)]
#[schema(as = crate::domain::engagement::AbuseReportRequest)]
pub struct AbuseReportSchema {
    #[schema(example = "spam")]
    reason: String,
    /// At most 1000 characters.
    details: Option<String>,
}

/// Body of `POST /reviews/photos/presign`.
#[derive(ToSchema)]
#[schema(as = crate::domain::photos::PresignPhotoRequest)]
pub struct PresignPhotoSchema {
    #[schema(example = "image/jpeg")]
    content_type: String,
    size_bytes: i64,
}

/// Body of `POST /reviews/photos/confirm`.
#[derive(ToSchema)]
#[schema(as = crate::domain::photos::ConfirmPhotoRequest)]
pub struct ConfirmPhotoSchema {
    #[schema(example = "reviews/users/3fa85f64-5717-4562-b3fc-2c963f66afa6/tmp/a.jpg")]
    object_key: String,
}
