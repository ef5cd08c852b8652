//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use uuid::Uuid;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn internal_error() -> Error {
    Error::internal("connection string leaked: postgres://secret")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}))
}

#[rstest]
#[case(Error::invalid_argument("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("duplicate summary"), StatusCode::CONFLICT)]
#[case(Error::idempotency_conflict("payload differs"), StatusCode::CONFLICT)]
#[case(Error::idempotency_in_progress("still running"), StatusCode::CONFLICT)]
#[case(Error::check_in_too_far("outside geofence"), StatusCode::CONFLICT)]
#[case(Error::check_in_suspicious("too fast"), StatusCode::CONFLICT)]
#[case(Error::too_many_requests("slow down"), StatusCode::TOO_MANY_REQUESTS)]
#[case(Error::check_in_cooldown("wait"), StatusCode::TOO_MANY_REQUESTS)]
#[case(Error::service_unavailable("store off"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn body_of(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("ascii header").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error JSON decodes");
    (status, header, body)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(internal_error: Error) {
    let (status, header, body) = body_of(&internal_error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(
        body,
        json!({"code": "internal", "message": "Internal server error", "trace_id": TRACE_ID})
    );
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::invalid_argument("summary too short")
        .with_details(json!({"field": "summary", "min": 60}));

    let (status, header, body) = body_of(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["message"], "summary too short");
    assert_eq!(body["details"], json!({"field": "summary", "min": 60}));
    assert!(body.get("trace_id").is_none());
}

#[rstest]
#[actix_web::test]
async fn scoped_trace_id_is_attached_when_missing() {
    let trace_id = TraceId::from_uuid(Uuid::from_u128(7));

    let (_, header, body) =
        TraceId::scope(trace_id, async { body_of(&Error::not_found("review")).await }).await;

    assert_eq!(header, Some(trace_id.to_string()));
    assert_eq!(body["trace_id"], trace_id.to_string());
}

#[rstest]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::Internal);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.trace_id(), None);
    assert_eq!(err.details(), None);
}
