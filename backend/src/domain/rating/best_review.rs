//! Representative review selection.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::inputs::ReviewFacts;
use crate::domain::ReviewId;

/// Review highlighted by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestReview {
    pub review_id: ReviewId,
    pub author_display_name: Option<String>,
    pub rating: u8,
    pub summary: String,
    pub helpful_score: f64,
    pub quality_score: u8,
    pub visit_verified: bool,
    pub created_at: DateTime<Utc>,
}

fn rank(a: &(&ReviewFacts, u8), b: &(&ReviewFacts, u8)) -> Ordering {
    let (left, left_quality) = a;
    let (right, right_quality) = b;
    left.helpful_score
        .total_cmp(&right.helpful_score)
        .then_with(|| left_quality.cmp(right_quality))
        .then_with(|| left.visit_verified().cmp(&right.visit_verified()))
        .then_with(|| left.created_at.cmp(&right.created_at))
        .then_with(|| left.review_id.cmp(&right.review_id))
}

/// Pick the maximum by `(helpful_score, quality, verified, created_at, id)`.
///
/// `qualities` is parallel to `reviews`.
#[must_use]
pub fn select_best_review(reviews: &[ReviewFacts], qualities: &[u8]) -> Option<BestReview> {
    reviews
        .iter()
        .zip(qualities.iter().copied())
        .max_by(rank)
        .map(|(review, quality_score)| BestReview {
            review_id: review.review_id,
            author_display_name: review.author_display_name.clone(),
            rating: review.rating,
            summary: review.summary.clone(),
            helpful_score: review.helpful_score,
            quality_score,
            visit_verified: review.visit_verified(),
            created_at: review.created_at,
        })
}
