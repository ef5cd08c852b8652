//! Check-in and visit verification entities.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;
use crate::domain::{CafeId, CheckInId, ReviewId, UserId, VerificationId};

/// Check-in state machine: `started → verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Started,
    Verified,
}

impl CheckInStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Verified => "verified",
        }
    }
}

/// Raised when a stored check-in status string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check-in status: {0}")]
pub struct UnknownCheckInStatus(pub String);

impl FromStr for CheckInStatus {
    type Err = UnknownCheckInStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "verified" => Ok(Self::Verified),
            other => Err(UnknownCheckInStatus(other.to_owned())),
        }
    }
}

/// Trust level of a visit verification. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Anything above `none` counts as a verified visit.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored confidence string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown confidence: {0}")]
pub struct UnknownConfidence(pub String);

impl FromStr for Confidence {
    type Err = UnknownConfidence;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownConfidence(other.to_owned())),
        }
    }
}

/// A user's claimed presence at a café.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub user_id: UserId,
    pub cafe_id: CafeId,
    pub status: CheckInStatus,
    pub started_at: DateTime<Utc>,
    pub start: GeoPoint,
    pub start_distance_m: f64,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_review_id: Option<ReviewId>,
    pub verify_point: Option<GeoPoint>,
    pub verify_distance_m: Option<f64>,
    pub dwell_seconds: Option<i64>,
    pub confidence: Option<Confidence>,
    pub risk_flags: Vec<String>,
    pub user_agent_hash: Option<String>,
    pub ip_prefix: Option<String>,
}

/// At most one per review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitVerification {
    pub id: VerificationId,
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub cafe_id: CafeId,
    pub confidence: Confidence,
    pub verified_at: Option<DateTime<Utc>>,
    pub dwell_seconds: i64,
}

impl VisitVerification {
    /// Merge a new attempt without ever lowering confidence.
    ///
    /// `verified_at` is set exactly when the resulting confidence is above
    /// `none`; an upgrade refreshes it.
    #[must_use]
    pub fn merge_attempt(
        existing: Option<Self>,
        attempt: Self,
    ) -> Self {
        match existing {
            Some(current) if current.confidence >= attempt.confidence => current,
            Some(current) => Self {
                id: current.id,
                ..attempt
            },
            None => attempt,
        }
    }
}
