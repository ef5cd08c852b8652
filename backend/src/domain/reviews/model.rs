//! Review entities as persisted by the write path.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CafeId, DrinkId, ReviewId, UserId};

/// Lifecycle of a review row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Published,
    Removed,
}

impl ReviewStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown review status: {0}")]
pub struct UnknownReviewStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = UnknownReviewStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(Self::Published),
            "removed" => Ok(Self::Removed),
            other => Err(UnknownReviewStatus(other.to_owned())),
        }
    }
}

/// Star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StarRating(u8);

/// Raised for ratings outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct StarRatingOutOfRange(pub i64);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, StarRatingOutOfRange> {
        u8::try_from(value)
            .ok()
            .filter(|rating| (Self::MIN..=Self::MAX).contains(rating))
            .map(Self)
            .ok_or(StarRatingOutOfRange(value))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for StarRating {
    type Error = StarRatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StarRating> for i64 {
    fn from(value: StarRating) -> Self {
        Self::from(value.0)
    }
}

/// One review per (user, café).
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub cafe_id: CafeId,
    pub rating: StarRating,
    pub summary: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == ReviewStatus::Published
    }
}

/// 1:1 companion row holding drink, tags and the duplicate fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAttributes {
    pub review_id: ReviewId,
    pub drink_id: Option<DrinkId>,
    pub drink_name: String,
    pub taste_tags: Vec<String>,
    pub summary_length: u32,
    pub summary_fingerprint: String,
    pub photo_count: u32,
}
