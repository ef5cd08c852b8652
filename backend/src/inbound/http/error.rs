//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while allowing Actix
//! handlers to turn domain failures into consistent JSON responses and status
//! codes. Errors raised without a trace id pick up the one in scope for the
//! request.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER, TraceId};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict
        | ErrorCode::IdempotencyConflict
        | ErrorCode::IdempotencyInProgress
        | ErrorCode::CheckInTooFar
        | ErrorCode::CheckInSuspicious => StatusCode::CONFLICT,
        ErrorCode::TooManyRequests | ErrorCode::CheckInCooldown => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn with_scoped_trace_id(error: &Error) -> Error {
    match (error.trace_id(), TraceId::current()) {
        (None, Some(trace_id)) => error.clone().with_trace_id(trace_id.to_string()),
        _ => error.clone(),
    }
}

fn redact_if_internal(error: Error) -> Error {
    if !matches!(error.code(), ErrorCode::Internal) {
        return error;
    }
    error!(message = %error.message(), trace_id = ?error.trace_id(), "internal error");
    let mut redacted = Error::internal("Internal server error");
    if let Some(id) = error.trace_id() {
        redacted = redacted.with_trace_id(id.to_owned());
    }
    redacted
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let payload = redact_if_internal(with_scoped_trace_id(self));
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = payload.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(payload)
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests;
