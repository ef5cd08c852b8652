//! Per-review facts gathered for a snapshot.

use chrono::{DateTime, Utc};

use crate::domain::checkins::Confidence;
use crate::domain::{ReviewId, UserId};

/// Everything the formulas need about one published review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewFacts {
    pub review_id: ReviewId,
    pub author_id: UserId,
    pub author_display_name: Option<String>,
    pub rating: u8,
    pub summary: String,
    pub summary_length: u32,
    pub drink_name: String,
    pub tags_count: u32,
    pub photo_count: u32,
    pub confidence: Confidence,
    pub confirmed_reports: u32,
    pub helpful_score: f64,
    pub created_at: DateTime<Utc>,
}

impl ReviewFacts {
    #[must_use]
    pub const fn visit_verified(&self) -> bool {
        self.confidence.is_verified()
    }
}

/// Inputs for one café.
#[derive(Debug, Clone, PartialEq)]
pub struct CafeRatingInputs {
    pub reviews: Vec<ReviewFacts>,
    /// Mean published rating across all cafés, if any review exists.
    pub global_mean: Option<f64>,
}
