//! Café rating snapshots: per-review quality, the bayesian aggregate,
//! best-review selection and optional descriptive tags.

mod best_review;
mod descriptive_tags;
mod engine;
mod formula;
mod inputs;
mod quality;
mod snapshot;

pub use best_review::{BestReview, select_best_review};
pub use descriptive_tags::{
    DESCRIPTIVE_TAGS_MAX, DESCRIPTIVE_TAGS_MIN_REVIEWS, DescriptiveTag, SuggestedTag,
    normalize_tags, tag_key,
};
pub use engine::{AiHealth, RatingEngine, RatingRebuildTask, RebuildReport, assemble_snapshot};
pub use formula::{
    AUTHOR_SCORE_NORM, BAYESIAN_M, DEFAULT_GLOBAL_MEAN, FormulaFallback, FormulaSettings,
    GATED_VERSIONS, QUALITY_V1, RATING_V2, RatingV2, ResolvedFormulas, rating_v2, round2,
};
pub use inputs::{CafeRatingInputs, ReviewFacts};
pub use quality::{QualityBreakdown, quality_v1};
pub use snapshot::{NO_REVIEWS_REASON, RatingSnapshot, ReviewQuality, SnapshotComponents};

#[cfg(test)]
mod tests;
