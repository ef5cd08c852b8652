//! Reputation ledger entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::checkins::Confidence;
use crate::domain::UserId;

/// Kinds of ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationEventType {
    HelpfulReceived,
    VisitVerified,
    AbuseConfirmed,
    ReviewRemoved,
}

impl ReputationEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HelpfulReceived => "helpful_received",
            Self::VisitVerified => "visit_verified",
            Self::AbuseConfirmed => "abuse_confirmed",
            Self::ReviewRemoved => "review_removed",
        }
    }

    /// Per-UTC-day ceiling on summed points, where one applies.
    #[must_use]
    pub const fn daily_cap(self) -> Option<f64> {
        match self {
            Self::HelpfulReceived => Some(20.0),
            Self::VisitVerified => Some(24.0),
            Self::AbuseConfirmed | Self::ReviewRemoved => None,
        }
    }

    /// Source entity type recorded with the event.
    #[must_use]
    pub const fn source_type(self) -> &'static str {
        match self {
            Self::HelpfulReceived => "helpful_vote",
            Self::VisitVerified => "visit_verification",
            Self::AbuseConfirmed => "abuse_report",
            Self::ReviewRemoved => "review",
        }
    }
}

impl fmt::Display for ReputationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for unknown stored event types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reputation event type: {0}")]
pub struct UnknownReputationEventType(pub String);

impl FromStr for ReputationEventType {
    type Err = UnknownReputationEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helpful_received" => Ok(Self::HelpfulReceived),
            "visit_verified" => Ok(Self::VisitVerified),
            "abuse_confirmed" => Ok(Self::AbuseConfirmed),
            "review_removed" => Ok(Self::ReviewRemoved),
            other => Err(UnknownReputationEventType(other.to_owned())),
        }
    }
}

/// Points for an `abuse_confirmed` entry against the review author.
pub const ABUSE_CONFIRMED_POINTS: i32 = -25;
/// Points for a moderator removing a review.
pub const REVIEW_REMOVED_POINTS: i32 = -10;

/// Points awarded to an author for a helpful vote of weight `weight`.
///
/// # Examples
/// ```
/// use backend::domain::reputation::helpful_received_points;
///
/// assert_eq!(helpful_received_points(0.8), 2);
/// assert_eq!(helpful_received_points(1.5), 3);
/// assert_eq!(helpful_received_points(0.2), 1);
/// ```
#[must_use]
pub fn helpful_received_points(weight: f64) -> i32 {
    let rounded = (2.0 * weight).round();
    if rounded.is_finite() && rounded >= 1.0 {
        rounded.min(f64::from(i32::MAX)) as i32
    } else {
        1
    }
}

/// Points for a verified visit by confidence.
#[must_use]
pub const fn visit_verified_points(confidence: Confidence, admin_verified: bool) -> i32 {
    match confidence {
        Confidence::None => 0,
        Confidence::Low => 1,
        Confidence::Medium => 3,
        Confidence::High if admin_verified => 8,
        Confidence::High => 6,
    }
}

/// Entry to append; duplicates on (user, type, source) are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReputationEvent {
    pub user_id: UserId,
    pub event_type: ReputationEventType,
    pub source_id: Uuid,
    pub points: i32,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Stored ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationEvent {
    pub id: Uuid,
    pub user_id: UserId,
    pub event_type: ReputationEventType,
    pub source_type: String,
    pub source_id: Uuid,
    pub points: i32,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}
