//! Inbox handlers and the effects they drive.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::consumers::REVIEWS_CORE_CONSUMER;
use super::model::InboxEvent;
use super::payload::EventBody;
use crate::domain::ports::ReputationRepository;
use crate::domain::reputation::{
    ABUSE_CONFIRMED_POINTS, NewReputationEvent, ReputationEventType, helpful_received_points,
    visit_verified_points,
};
use crate::domain::{CafeId, Error, PhotoUploadId};

/// One inbox consumer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Consumer name matched against `consumer_inbox.consumer`.
    fn consumer(&self) -> &str;

    /// Apply the event. Must be safe to run more than once.
    async fn handle(&self, event: &InboxEvent, body: EventBody) -> Result<(), Error>;
}

/// Rebuilds a café's rating snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CafeRecompute: Send + Sync {
    async fn recompute_cafe(&self, cafe_id: CafeId) -> Result<(), Error>;
}

/// Optimises one uploaded photo.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoProcessing: Send + Sync {
    async fn process_upload(&self, upload_id: PhotoUploadId) -> Result<(), Error>;
}

/// The `reviews_core` consumer: reputation accrual, snapshot refresh and
/// photo processing.
pub struct ReviewsCoreHandler {
    ratings: Arc<dyn CafeRecompute>,
    reputation: Arc<dyn ReputationRepository>,
    photos: Arc<dyn PhotoProcessing>,
    clock: Arc<dyn Clock>,
}

impl ReviewsCoreHandler {
    pub fn new(
        ratings: Arc<dyn CafeRecompute>,
        reputation: Arc<dyn ReputationRepository>,
        photos: Arc<dyn PhotoProcessing>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ratings,
            reputation,
            photos,
            clock,
        }
    }

    async fn accrue(&self, event: NewReputationEvent) -> Result<(), Error> {
        let inserted = self.reputation.append(&event).await?;
        info!(
            user_id = %event.user_id,
            event_type = event.event_type.as_str(),
            points = event.points,
            inserted,
            "reputation accrued"
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ReviewsCoreHandler {
    fn consumer(&self) -> &str {
        REVIEWS_CORE_CONSUMER
    }

    async fn handle(&self, event: &InboxEvent, body: EventBody) -> Result<(), Error> {
        let now = self.clock.utc();
        let metadata = json!({ "outbox_event_id": event.outbox_event_id });
        match &body {
            EventBody::ReviewCreated(_) | EventBody::ReviewUpdated(_) => {}
            EventBody::VoteHelpfulAdded(vote) => {
                self.accrue(NewReputationEvent {
                    user_id: vote.author_user_id,
                    event_type: ReputationEventType::HelpfulReceived,
                    source_id: *vote.vote_id.as_uuid(),
                    points: helpful_received_points(vote.weight),
                    metadata,
                    created_at: now,
                })
                .await?;
            }
            EventBody::VisitVerified(visit) => {
                self.accrue(NewReputationEvent {
                    user_id: visit.user_id,
                    event_type: ReputationEventType::VisitVerified,
                    source_id: *visit.visit_verification_id.as_uuid(),
                    points: visit_verified_points(visit.confidence, visit.admin_verified),
                    metadata,
                    created_at: now,
                })
                .await?;
            }
            EventBody::AbuseConfirmed(abuse) => {
                self.accrue(NewReputationEvent {
                    user_id: abuse.author_user_id,
                    event_type: ReputationEventType::AbuseConfirmed,
                    source_id: *abuse.abuse_report_id.as_uuid(),
                    points: ABUSE_CONFIRMED_POINTS,
                    metadata,
                    created_at: now,
                })
                .await?;
            }
            EventBody::PhotoProcessRequested(photo) => {
                return self.photos.process_upload(photo.photo_upload_id).await;
            }
        }
        if let Some(cafe_id) = body.cafe_id() {
            self.ratings.recompute_cafe(cafe_id).await?;
        }
        Ok(())
    }
}
