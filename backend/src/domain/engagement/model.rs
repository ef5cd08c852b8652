//! Helpful votes and abuse reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReportId, ReviewId, UserId, VoteId};

/// Lower bound of a helpful-vote weight.
pub const VOTE_WEIGHT_MIN: f64 = 0.8;
/// Upper bound of a helpful-vote weight.
pub const VOTE_WEIGHT_MAX: f64 = 1.5;

/// Weight of a helpful vote given the voter's reputation score.
///
/// # Examples
/// ```
/// use backend::domain::engagement::helpful_vote_weight;
///
/// assert!((helpful_vote_weight(0.0) - 0.8).abs() < 1e-9);
/// assert!((helpful_vote_weight(1000.0) - 1.5).abs() < 1e-9);
/// assert!((helpful_vote_weight(5000.0) - 1.5).abs() < 1e-9);
/// ```
#[must_use]
pub fn helpful_vote_weight(voter_score: f64) -> f64 {
    let score = voter_score.clamp(0.0, 1000.0);
    (VOTE_WEIGHT_MIN + 0.7 * (score / 1000.0)).clamp(VOTE_WEIGHT_MIN, VOTE_WEIGHT_MAX)
}

/// Unique per (review, voter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpfulVote {
    pub id: VoteId,
    pub review_id: ReviewId,
    pub voter_user_id: UserId,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

/// Why a review was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbuseReason {
    Spam,
    Offensive,
    Fake,
    OffTopic,
    Other,
}

impl AbuseReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Offensive => "offensive",
            Self::Fake => "fake",
            Self::OffTopic => "off_topic",
            Self::Other => "other",
        }
    }
}

/// Raised for unknown stored reasons or statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown abuse {kind}: {value}")]
pub struct UnknownAbuseValue {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for AbuseReason {
    type Err = UnknownAbuseValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(Self::Spam),
            "offensive" => Ok(Self::Offensive),
            "fake" => Ok(Self::Fake),
            "off_topic" => Ok(Self::OffTopic),
            "other" => Ok(Self::Other),
            other => Err(UnknownAbuseValue {
                kind: "reason",
                value: other.to_owned(),
            }),
        }
    }
}

/// Abuse report lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbuseStatus {
    Open,
    Confirmed,
    Dismissed,
}

impl AbuseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Confirmed => "confirmed",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for AbuseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbuseStatus {
    type Err = UnknownAbuseValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "confirmed" => Ok(Self::Confirmed),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(UnknownAbuseValue {
                kind: "status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Unique per (review, reporter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseReport {
    pub id: ReportId,
    pub review_id: ReviewId,
    pub reporter_user_id: UserId,
    pub reason: AbuseReason,
    pub details: Option<String>,
    pub status: AbuseStatus,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
