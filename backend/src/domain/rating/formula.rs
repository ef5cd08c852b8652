//! `rating_v2`: bayesian-smoothed, trust-multiplied café rating, plus the
//! version flags that select it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::inputs::ReviewFacts;
use crate::domain::UserId;

pub const RATING_V2: &str = "rating_v2";
pub const QUALITY_V1: &str = "quality_v1";
/// Accepted but not implemented; requests for them fall back.
pub const GATED_VERSIONS: [&str; 2] = ["rating_v3", "quality_v2"];

/// Prior pseudo-count for bayesian smoothing.
pub const BAYESIAN_M: f64 = 20.0;
/// Prior used when no published review exists anywhere.
pub const DEFAULT_GLOBAL_MEAN: f64 = 4.0;
/// Author score mapping to a full reputation contribution.
pub const AUTHOR_SCORE_NORM: f64 = 300.0;

/// Requested formula versions, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaSettings {
    pub rating_version: String,
    pub quality_version: String,
}

impl Default for FormulaSettings {
    fn default() -> Self {
        Self {
            rating_version: RATING_V2.to_owned(),
            quality_version: QUALITY_V1.to_owned(),
        }
    }
}

/// A requested version that was accepted but replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaFallback {
    pub kind: String,
    pub requested: String,
    pub applied: String,
    pub reason: String,
}

/// Effective versions after applying fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFormulas {
    pub rating_version: String,
    pub quality_version: String,
    pub requested_rating_version: String,
    pub requested_quality_version: String,
    pub fallbacks: Vec<FormulaFallback>,
}

fn resolve_one(kind: &str, requested: &str, implemented: &str) -> Option<FormulaFallback> {
    let requested = requested.trim().to_ascii_lowercase();
    if requested.is_empty() || requested == implemented {
        return None;
    }
    let reason = if GATED_VERSIONS.contains(&requested.as_str()) {
        "not_implemented"
    } else {
        "unknown_version"
    };
    Some(FormulaFallback {
        kind: kind.to_owned(),
        requested,
        applied: implemented.to_owned(),
        reason: reason.to_owned(),
    })
}

impl FormulaSettings {
    /// Resolve requested versions to the implemented ones.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::rating::FormulaSettings;
    ///
    /// let settings = FormulaSettings {
    ///     rating_version: "rating_v3".to_owned(),
    ///     quality_version: "quality_v1".to_owned(),
    /// };
    /// let resolved = settings.resolve();
    /// assert_eq!(resolved.rating_version, "rating_v2");
    /// assert_eq!(resolved.fallbacks.len(), 1);
    /// assert_eq!(resolved.fallbacks[0].reason, "not_implemented");
    /// ```
    #[must_use]
    pub fn resolve(&self) -> ResolvedFormulas {
        let fallbacks = [
            resolve_one("rating", &self.rating_version, RATING_V2),
            resolve_one("quality", &self.quality_version, QUALITY_V1),
        ]
        .into_iter()
        .flatten()
        .collect();
        ResolvedFormulas {
            rating_version: RATING_V2.to_owned(),
            quality_version: QUALITY_V1.to_owned(),
            requested_rating_version: self.rating_version.clone(),
            requested_quality_version: self.quality_version.clone(),
            fallbacks,
        }
    }
}

/// Intermediate values of `rating_v2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingV2 {
    pub reviews_count: u32,
    pub verified_reviews_count: u32,
    pub ratings_mean: f64,
    pub global_mean: f64,
    pub verified_share: f64,
    pub author_rep_avg_norm: f64,
    pub fraud_risk: f64,
    pub bayesian_m: f64,
    pub base: f64,
    pub trust: f64,
    pub rating: f64,
}

/// Round to two decimals for persistence.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn count_f64(count: usize) -> f64 {
    u32::try_from(count).map_or(f64::from(u32::MAX), f64::from)
}

/// Compute `rating_v2`; `None` when the café has no published reviews.
///
/// `author_scores` holds ledger scores keyed by author; missing authors
/// count as zero.
#[must_use]
pub fn rating_v2<S: std::hash::BuildHasher>(
    reviews: &[ReviewFacts],
    author_scores: &HashMap<UserId, f64, S>,
    global_mean: Option<f64>,
) -> Option<RatingV2> {
    if reviews.is_empty() {
        return None;
    }
    let n = count_f64(reviews.len());
    let ratings_mean = reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / n;
    let global_mean = global_mean.unwrap_or(DEFAULT_GLOBAL_MEAN).clamp(1.0, 5.0);
    let verified = reviews.iter().filter(|r| r.visit_verified()).count();
    let verified_share = (count_f64(verified) / n).clamp(0.0, 1.0);
    let author_rep_avg_norm = reviews
        .iter()
        .map(|r| {
            let score = author_scores.get(&r.author_id).copied().unwrap_or(0.0);
            (score / AUTHOR_SCORE_NORM).clamp(0.0, 1.0)
        })
        .sum::<f64>()
        / n;
    let abused = reviews.iter().filter(|r| r.confirmed_reports > 0).count();
    let fraud_risk = (count_f64(abused) / n).clamp(0.0, 1.0);
    let base = (n / (n + BAYESIAN_M)) * ratings_mean + (BAYESIAN_M / (n + BAYESIAN_M)) * global_mean;
    let trust = 1.0 + 0.25 * verified_share + 0.20 * author_rep_avg_norm - 0.35 * fraud_risk;
    let rating = (base * trust).clamp(1.0, 5.0);
    Some(RatingV2 {
        reviews_count: u32::try_from(reviews.len()).unwrap_or(u32::MAX),
        verified_reviews_count: u32::try_from(verified).unwrap_or(u32::MAX),
        ratings_mean,
        global_mean,
        verified_share,
        author_rep_avg_norm,
        fraud_risk,
        bayesian_m: BAYESIAN_M,
        base,
        trust,
        rating,
    })
}
