//! Reputation ledger: append-only point events and the score derived
//! from them on read.

mod model;
mod score;
mod tiers;

use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;

use crate::domain::ports::ReputationRepository;
use crate::domain::{Error, UserId};

pub use model::{
    ABUSE_CONFIRMED_POINTS, NewReputationEvent, REVIEW_REMOVED_POINTS, ReputationEvent,
    ReputationEventType, UnknownReputationEventType, helpful_received_points,
    visit_verified_points,
};
pub use score::{SCORE_MAX, compute_score, decay_factor};
pub use tiers::{ReputationTier, TRUSTED_THRESHOLD};

/// Public reputation view of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReputationSummary {
    pub user_id: UserId,
    /// Derived score rounded to two decimals.
    pub score: f64,
    pub tier: ReputationTier,
    pub badge: &'static str,
    pub is_trusted: bool,
    pub events_count: usize,
}

/// Reads scores off the ledger.
pub struct ReputationLedger {
    repository: Arc<dyn ReputationRepository>,
    clock: Arc<dyn Clock>,
}

impl ReputationLedger {
    pub fn new(repository: Arc<dyn ReputationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Score for `user_id` at the current instant.
    pub async fn score(&self, user_id: UserId) -> Result<f64, Error> {
        let events = self.repository.events_for_user(user_id).await?;
        Ok(compute_score(&events, self.clock.utc()))
    }

    pub async fn summary(&self, user_id: UserId) -> Result<ReputationSummary, Error> {
        let events = self.repository.events_for_user(user_id).await?;
        let score = compute_score(&events, self.clock.utc());
        let tier = ReputationTier::for_score(score);
        Ok(ReputationSummary {
            user_id,
            score: (score * 100.0).round() / 100.0,
            tier,
            badge: tier.label(),
            is_trusted: tier.is_trusted(),
            events_count: events.len(),
        })
    }
}

#[cfg(test)]
mod tests;
