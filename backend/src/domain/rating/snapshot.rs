//! Persisted café rating snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::best_review::BestReview;
use super::descriptive_tags::DescriptiveTag;
use super::formula::FormulaFallback;
use crate::domain::{CafeId, ReviewId};

/// Reason recorded for a café without published reviews.
pub const NO_REVIEWS_REASON: &str = "no_reviews";

/// Quality score of one review, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQuality {
    pub review_id: ReviewId,
    pub quality_score: u8,
}

/// Intermediate values stored in `components`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotComponents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub formula_version: String,
    pub quality_version: String,
    pub verified_share: f64,
    pub ratings_mean: f64,
    pub global_mean: f64,
    pub author_rep_avg_norm: f64,
    pub fraud_risk: f64,
    pub bayesian_m: f64,
    pub base: f64,
    pub trust: f64,
    #[serde(default)]
    pub formula_fallbacks: Vec<FormulaFallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_review: Option<BestReview>,
    #[serde(default)]
    pub review_quality: Vec<ReviewQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptive_tags: Option<Vec<DescriptiveTag>>,
}

/// One row per café.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub cafe_id: CafeId,
    pub formula_version: String,
    pub rating: f64,
    pub reviews_count: u32,
    pub verified_reviews_count: u32,
    pub fraud_risk: f64,
    pub components: SnapshotComponents,
    pub computed_at: DateTime<Utc>,
}
