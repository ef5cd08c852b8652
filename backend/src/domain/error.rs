//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses; background workers record them on inbox or photo rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error codes exposed to API clients.
///
/// # Examples
/// ```
/// use backend::domain::ErrorCode;
///
/// let code = ErrorCode::IdempotencyConflict;
/// assert_eq!(code.as_str(), "idempotency_conflict");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed input: missing fields, out-of-range values, unknown enums.
    InvalidArgument,
    /// No authenticated user accompanied the request.
    Unauthorized,
    /// The caller lacks the role or ownership required.
    Forbidden,
    /// A referenced café, review, check-in or report does not exist.
    NotFound,
    /// A business rule rejected the mutation.
    Conflict,
    /// The idempotency key was reused with a different payload.
    IdempotencyConflict,
    /// A request with the same idempotency key is still executing.
    IdempotencyInProgress,
    /// A per-user rate limiter rejected the request.
    TooManyRequests,
    /// A check-in at another café started too recently.
    CheckInCooldown,
    /// The claimed location is outside the café geofence.
    CheckInTooFar,
    /// The implied travel speed between check-ins is implausible.
    CheckInSuspicious,
    /// A required collaborator (object store, datastore) is unavailable.
    ServiceUnavailable,
    /// Unclassified failure.
    Internal,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::IdempotencyConflict => "idempotency_conflict",
            Self::IdempotencyInProgress => "idempotency_in_progress",
            Self::TooManyRequests => "too_many_requests",
            Self::CheckInCooldown => "check_in_cooldown",
            Self::CheckInTooFar => "check_in_too_far",
            Self::CheckInSuspicious => "check_in_suspicious",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API error carried from the domain to every adapter.
///
/// `trace_id` is attached by inbound adapters; HTTP also echoes it in the
/// `trace-id` header.
///
/// # Examples
/// ```
/// use backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("review not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.message(), "review not found");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    trace_id: Option<String>,
}

impl Error {
    /// Build an error; blank messages fall back to the code itself.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.as_str().to_owned()
        } else {
            message
        };
        Self {
            code,
            message,
            details: None,
            trace_id: None,
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Attach structured details for clients.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a correlation identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn idempotency_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IdempotencyConflict, message)
    }

    pub fn idempotency_in_progress(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IdempotencyInProgress, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    pub fn check_in_cooldown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CheckInCooldown, message)
    }

    pub fn check_in_too_far(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CheckInTooFar, message)
    }

    pub fn check_in_suspicious(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CheckInSuspicious, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}
