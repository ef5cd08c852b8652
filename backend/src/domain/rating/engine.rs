//! Snapshot engine: gathers inputs, applies the formulas, persists the
//! result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{error, info, warn};

use super::best_review::select_best_review;
use super::descriptive_tags::{DESCRIPTIVE_TAGS_MIN_REVIEWS, DescriptiveTag, normalize_tags};
use super::formula::{FormulaSettings, ResolvedFormulas, rating_v2, round2};
use super::inputs::{CafeRatingInputs, ReviewFacts};
use super::quality::quality_v1;
use super::snapshot::{NO_REVIEWS_REASON, RatingSnapshot, ReviewQuality, SnapshotComponents};
use crate::domain::background::BackgroundTask;
use crate::domain::events::CafeRecompute;
use crate::domain::ports::{RatingRepository, ReputationRepository, ReviewSummarizer};
use crate::domain::reputation::compute_score;
use crate::domain::{CafeId, Error, UserId};

/// Pure snapshot assembly from gathered inputs.
///
/// `descriptive_tags` is `None` when the summariser was not consulted.
#[must_use]
pub fn assemble_snapshot(
    cafe_id: CafeId,
    inputs: &CafeRatingInputs,
    author_scores: &HashMap<UserId, f64>,
    formulas: &ResolvedFormulas,
    descriptive_tags: Option<Vec<DescriptiveTag>>,
    computed_at: DateTime<Utc>,
) -> RatingSnapshot {
    let qualities: Vec<u8> = inputs
        .reviews
        .iter()
        .map(|review| quality_v1(review).score)
        .collect();
    let review_quality = inputs
        .reviews
        .iter()
        .zip(&qualities)
        .map(|(review, quality_score)| ReviewQuality {
            review_id: review.review_id,
            quality_score: *quality_score,
        })
        .collect();

    let Some(aggregate) = rating_v2(&inputs.reviews, author_scores, inputs.global_mean) else {
        return RatingSnapshot {
            cafe_id,
            formula_version: formulas.rating_version.clone(),
            rating: 0.0,
            reviews_count: 0,
            verified_reviews_count: 0,
            fraud_risk: 0.0,
            components: SnapshotComponents {
                reason: Some(NO_REVIEWS_REASON.to_owned()),
                formula_version: formulas.rating_version.clone(),
                quality_version: formulas.quality_version.clone(),
                verified_share: 0.0,
                ratings_mean: 0.0,
                global_mean: inputs
                    .global_mean
                    .unwrap_or(super::formula::DEFAULT_GLOBAL_MEAN)
                    .clamp(1.0, 5.0),
                author_rep_avg_norm: 0.0,
                fraud_risk: 0.0,
                bayesian_m: super::formula::BAYESIAN_M,
                base: 0.0,
                trust: 0.0,
                formula_fallbacks: formulas.fallbacks.clone(),
                best_review: None,
                review_quality,
                descriptive_tags: None,
            },
            computed_at,
        };
    };

    RatingSnapshot {
        cafe_id,
        formula_version: formulas.rating_version.clone(),
        rating: round2(aggregate.rating),
        reviews_count: aggregate.reviews_count,
        verified_reviews_count: aggregate.verified_reviews_count,
        fraud_risk: round2(aggregate.fraud_risk),
        components: SnapshotComponents {
            reason: None,
            formula_version: formulas.rating_version.clone(),
            quality_version: formulas.quality_version.clone(),
            verified_share: aggregate.verified_share,
            ratings_mean: aggregate.ratings_mean,
            global_mean: aggregate.global_mean,
            author_rep_avg_norm: aggregate.author_rep_avg_norm,
            fraud_risk: aggregate.fraud_risk,
            bayesian_m: aggregate.bayesian_m,
            base: aggregate.base,
            trust: aggregate.trust,
            formula_fallbacks: formulas.fallbacks.clone(),
            best_review: select_best_review(&inputs.reviews, &qualities),
            review_quality,
            descriptive_tags,
        },
        computed_at,
    }
}

/// Summariser status exposed to admins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AiHealth {
    pub enabled: bool,
    pub model: Option<String>,
    pub min_reviews: usize,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Outcome of a full rebuild pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub cafes: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct AiState {
    last_success_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

/// Builds, stores and serves café rating snapshots.
pub struct RatingEngine {
    ratings: Arc<dyn RatingRepository>,
    reputation: Arc<dyn ReputationRepository>,
    summarizer: Arc<dyn ReviewSummarizer>,
    formulas: ResolvedFormulas,
    clock: Arc<dyn Clock>,
    ai_state: Mutex<AiState>,
}

impl RatingEngine {
    pub fn new(
        ratings: Arc<dyn RatingRepository>,
        reputation: Arc<dyn ReputationRepository>,
        summarizer: Arc<dyn ReviewSummarizer>,
        settings: &FormulaSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let formulas = settings.resolve();
        for fallback in &formulas.fallbacks {
            warn!(
                kind = %fallback.kind,
                requested = %fallback.requested,
                applied = %fallback.applied,
                reason = %fallback.reason,
                "formula version fell back"
            );
        }
        Self {
            ratings,
            reputation,
            summarizer,
            formulas,
            clock,
            ai_state: Mutex::new(AiState::default()),
        }
    }

    /// Recompute and persist the café's snapshot.
    pub async fn recompute(&self, cafe_id: CafeId) -> Result<RatingSnapshot, Error> {
        let inputs = self.ratings.load_inputs(cafe_id).await?;
        let author_scores = self.author_scores(&inputs.reviews).await?;
        let descriptive_tags = self.descriptive_tags(cafe_id, &inputs.reviews).await;
        let snapshot = assemble_snapshot(
            cafe_id,
            &inputs,
            &author_scores,
            &self.formulas,
            descriptive_tags,
            self.clock.utc(),
        );
        self.ratings.upsert_snapshot(&snapshot).await?;
        info!(
            %cafe_id,
            rating = snapshot.rating,
            reviews_count = snapshot.reviews_count,
            formula_version = %snapshot.formula_version,
            "rating snapshot recomputed"
        );
        Ok(snapshot)
    }

    /// Stored snapshot, or a freshly computed one when none exists yet.
    pub async fn snapshot(&self, cafe_id: CafeId) -> Result<RatingSnapshot, Error> {
        if !self.ratings.cafe_exists(cafe_id).await? {
            return Err(Error::not_found(format!("cafe {cafe_id} not found")));
        }
        match self.ratings.find_snapshot(cafe_id).await? {
            Some(snapshot) => Ok(snapshot),
            None => self.recompute(cafe_id).await,
        }
    }

    /// Admin-triggered recompute of one café.
    pub async fn force_recompute(&self, cafe_id: CafeId) -> Result<RatingSnapshot, Error> {
        if !self.ratings.cafe_exists(cafe_id).await? {
            return Err(Error::not_found(format!("cafe {cafe_id} not found")));
        }
        self.recompute(cafe_id).await
    }

    /// Recompute every café; individual failures are logged and counted.
    pub async fn rebuild_all(&self) -> Result<RebuildReport, Error> {
        let cafe_ids = self.ratings.list_cafe_ids().await?;
        let mut report = RebuildReport {
            cafes: cafe_ids.len(),
            failed: 0,
        };
        for cafe_id in cafe_ids {
            if let Err(err) = self.recompute(cafe_id).await {
                report.failed += 1;
                error!(%cafe_id, error = %err, "snapshot rebuild failed");
            }
        }
        info!(cafes = report.cafes, failed = report.failed, "snapshot rebuild finished");
        Ok(report)
    }

    pub fn ai_health(&self) -> AiHealth {
        let model = self.summarizer.model();
        let state = self
            .ai_state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        AiHealth {
            enabled: model.is_some(),
            model,
            min_reviews: DESCRIPTIVE_TAGS_MIN_REVIEWS,
            last_success_at: state.last_success_at,
            last_error: state.last_error.clone(),
            last_error_at: state.last_error_at,
        }
    }

    /// Requested and effective formula versions.
    #[must_use]
    pub fn versioning_status(&self) -> &ResolvedFormulas {
        &self.formulas
    }

    async fn author_scores(&self, reviews: &[ReviewFacts]) -> Result<HashMap<UserId, f64>, Error> {
        let now = self.clock.utc();
        let mut scores = HashMap::new();
        for review in reviews {
            if scores.contains_key(&review.author_id) {
                continue;
            }
            let events = self.reputation.events_for_user(review.author_id).await?;
            scores.insert(review.author_id, compute_score(&events, now));
        }
        Ok(scores)
    }

    async fn descriptive_tags(
        &self,
        cafe_id: CafeId,
        reviews: &[ReviewFacts],
    ) -> Option<Vec<DescriptiveTag>> {
        let model = self.summarizer.model()?;
        if reviews.len() < DESCRIPTIVE_TAGS_MIN_REVIEWS {
            return None;
        }
        let summaries: Vec<String> = reviews.iter().map(|review| review.summary.clone()).collect();
        match self.summarizer.descriptive_tags(&summaries).await {
            Ok(suggested) => {
                self.record_ai(Ok(()));
                Some(normalize_tags(suggested, reviews.len(), &model))
            }
            Err(err) => {
                warn!(%cafe_id, error = %err, "descriptive tags unavailable");
                self.record_ai(Err(err.to_string()));
                None
            }
        }
    }

    fn record_ai(&self, outcome: Result<(), String>) {
        let now = self.clock.utc();
        let mut state = self
            .ai_state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match outcome {
            Ok(()) => state.last_success_at = Some(now),
            Err(message) => {
                state.last_error = Some(message);
                state.last_error_at = Some(now);
            }
        }
    }
}

#[async_trait]
impl CafeRecompute for RatingEngine {
    async fn recompute_cafe(&self, cafe_id: CafeId) -> Result<(), Error> {
        self.recompute(cafe_id).await.map(|_| ())
    }
}

/// Periodic full rebuild that heals snapshots missed by the event path.
pub struct RatingRebuildTask {
    engine: Arc<RatingEngine>,
}

impl RatingRebuildTask {
    pub fn new(engine: Arc<RatingEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl BackgroundTask for RatingRebuildTask {
    fn name(&self) -> &'static str {
        "rating_rebuild"
    }

    async fn run_once(&self) -> Result<bool, Error> {
        self.engine.rebuild_all().await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests;
