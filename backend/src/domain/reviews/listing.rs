//! Read model for a café's review feed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};

use crate::domain::checkins::Confidence;
use crate::domain::ports::ReviewQuery;
use crate::domain::{CafeId, DrinkId, Error, ReviewId, UserId};

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    /// Newest first.
    #[default]
    New,
    /// Highest helpful score first.
    Helpful,
    /// Strongest visit confidence first.
    Verified,
}

impl ReviewSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Helpful => "helpful",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for ReviewSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "new" => Ok(Self::New),
            "helpful" => Ok(Self::Helpful),
            "verified" => Ok(Self::Verified),
            other => Err(Error::invalid_argument(format!(
                "sort must be one of new, helpful, verified; got {other}"
            ))),
        }
    }
}

/// One published review as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewListItem {
    pub id: ReviewId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_display_name: Option<String>,
    pub rating: u8,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drink_id: Option<DrinkId>,
    pub drink_name: String,
    pub taste_tags: Vec<String>,
    pub photos: Vec<String>,
    pub helpful_score: f64,
    pub helpful_count: u32,
    pub visit_confidence: Confidence,
    pub visit_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Paged listing of published reviews.
pub struct ReviewFeed<Q> {
    query: Arc<Q>,
}

impl<Q> Clone for ReviewFeed<Q> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
        }
    }
}

impl<Q: ReviewQuery> ReviewFeed<Q> {
    pub fn new(query: Arc<Q>) -> Self {
        Self { query }
    }

    /// One page of the café's published reviews.
    pub async fn list(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        params: PageParams,
    ) -> Result<Paginated<ReviewListItem>, Error> {
        if !self.query.cafe_exists(cafe_id).await? {
            return Err(Error::not_found(format!("cafe {cafe_id} not found")));
        }
        let rows = self
            .query
            .list_cafe_reviews(cafe_id, sort, params.offset(), params.fetch_limit())
            .await?;
        Ok(Paginated::from_rows(rows, params))
    }
}
