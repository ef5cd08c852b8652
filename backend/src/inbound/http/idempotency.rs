//! Helpers for the `Idempotency-Key` request header and replay responses.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use actix_web::http::header::HeaderMap;
use serde_json::json;

use crate::domain::Error;
use crate::domain::idempotency::{
    IDEMPOTENCY_KEY_MAX_LEN, IdempotencyKey, IdempotencyKeyValidationError, IdempotentResponse,
};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
/// Response header telling clients whether a stored response was replayed.
pub const IDEMPOTENT_REPLAY_HEADER: &str = "X-Idempotent-Replay";

/// Extract the mandatory idempotency key from request headers.
pub fn require_idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, Error> {
    let raw = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .ok_or_else(|| {
            Error::invalid_argument("Idempotency-Key header is required")
                .with_details(json!({ "header": IDEMPOTENCY_KEY_HEADER }))
        })?
        .to_str()
        .map_err(|_| {
            Error::invalid_argument("Idempotency-Key header must be visible ASCII")
                .with_details(json!({ "header": IDEMPOTENCY_KEY_HEADER }))
        })?;
    IdempotencyKey::new(raw).map_err(map_idempotency_key_error)
}

/// Map idempotency key validation errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyKeyValidationError) -> Error {
    let message = match err {
        IdempotencyKeyValidationError::EmptyKey => {
            "Idempotency-Key header must not be empty".to_owned()
        }
        IdempotencyKeyValidationError::TooLong { max } => {
            format!("Idempotency-Key header must be at most {max} characters")
        }
        IdempotencyKeyValidationError::ControlCharacters => {
            "Idempotency-Key header must not contain control characters".to_owned()
        }
    };
    Error::invalid_argument(message).with_details(json!({
        "header": IDEMPOTENCY_KEY_HEADER,
        "max_length": IDEMPOTENCY_KEY_MAX_LEN,
    }))
}

/// Render a stored or fresh mutation outcome with the replay flag.
pub fn respond(response: IdempotentResponse) -> Result<HttpResponse, Error> {
    let status = StatusCode::from_u16(response.status).map_err(|_| {
        Error::internal(format!("stored response has invalid status {}", response.status))
    })?;
    Ok(HttpResponse::build(status)
        .insert_header((
            IDEMPOTENT_REPLAY_HEADER,
            if response.replayed { "true" } else { "false" },
        ))
        .json(response.body))
}
