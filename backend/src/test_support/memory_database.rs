//! Shared tables and the transactional [`ReviewsStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::checkins::{CheckIn, CheckInStatus, GeoPoint, VisitVerification};
use crate::domain::drinks::{Drink, UnknownDrinkFormat, UnknownDrinkStatus};
use crate::domain::engagement::{AbuseReport, HelpfulVote};
use crate::domain::events::{DlqEntry, EventStatus, InboxEvent, NewDomainEvent, OutboxEvent};
use crate::domain::idempotency::{
    IN_FLIGHT_STATUS, IdempotencyKey, IdempotencyScope, MutationResponse, RequestHash,
    StoredIdempotency,
};
use crate::domain::photos::PhotoUpload;
use crate::domain::ports::tx::{
    CatalogueTx, CheckInTx, EngagementTx, IdempotencyTx, OutboxTx, PhotoUploadTx, ReputationTx,
    ReviewTx,
};
use crate::domain::ports::{ReviewsStore, StoreError, UnitOfWork};
use crate::domain::rating::RatingSnapshot;
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};
use crate::domain::reviews::{Review, ReviewAttributes, ReviewStatus};
use crate::domain::{CafeId, CheckInId, DrinkId, Error, ReportId, ReviewId, UserId};

/// Every row the reviews core persists.
#[derive(Debug, Clone, Default)]
pub(super) struct Tables {
    pub(super) cafes: HashMap<CafeId, GeoPoint>,
    pub(super) display_names: HashMap<UserId, String>,
    pub(super) drinks: Vec<Drink>,
    pub(super) unknown_drinks: HashMap<String, UnknownDrinkFormat>,
    pub(super) idempotency: HashMap<(String, String), StoredIdempotency>,
    pub(super) reviews: Vec<Review>,
    pub(super) attributes: HashMap<ReviewId, ReviewAttributes>,
    pub(super) review_photos: HashMap<ReviewId, Vec<String>>,
    pub(super) checkins: Vec<CheckIn>,
    pub(super) verifications: HashMap<ReviewId, VisitVerification>,
    pub(super) helpful_votes: Vec<HelpfulVote>,
    pub(super) abuse_reports: Vec<AbuseReport>,
    pub(super) reputation: Vec<ReputationEvent>,
    pub(super) uploads: Vec<PhotoUpload>,
    pub(super) outbox: Vec<OutboxEvent>,
    pub(super) inbox: Vec<InboxEvent>,
    pub(super) dlq: Vec<DlqEntry>,
    pub(super) snapshots: HashMap<CafeId, RatingSnapshot>,
}

impl Tables {
    pub(super) fn review(&self, review_id: ReviewId) -> Option<&Review> {
        self.reviews.iter().find(|review| review.id == review_id)
    }

    /// Ledger rows for one user, oldest first.
    pub(super) fn reputation_events(&self, user_id: UserId) -> Vec<ReputationEvent> {
        let mut events: Vec<ReputationEvent> = self
            .reputation
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.created_at);
        events
    }

    /// Unique on (user, type, source type, source id).
    pub(super) fn append_reputation_event(&mut self, event: &NewReputationEvent) -> bool {
        let source_type = event.event_type.source_type();
        let duplicate = self.reputation.iter().any(|existing| {
            existing.user_id == event.user_id
                && existing.event_type == event.event_type
                && existing.source_type == source_type
                && existing.source_id == event.source_id
        });
        if duplicate {
            return false;
        }
        self.reputation.push(ReputationEvent {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            event_type: event.event_type,
            source_type: source_type.to_owned(),
            source_id: event.source_id,
            points: event.points,
            metadata: event.metadata.clone(),
            created_at: event.created_at,
        });
        true
    }
}

/// In-memory stand-in for PostgreSQL.
///
/// Clones share the same tables. Transactions are serialised: the tables
/// stay locked while a unit of work runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().await
    }

    pub async fn seed_cafe(&self, cafe_id: CafeId, location: GeoPoint) {
        self.lock().await.cafes.insert(cafe_id, location);
    }

    pub async fn seed_display_name(&self, user_id: UserId, display_name: &str) {
        self.lock()
            .await
            .display_names
            .insert(user_id, display_name.to_owned());
    }

    pub async fn seed_drink(&self, drink: Drink) {
        self.lock().await.drinks.push(drink);
    }

    pub async fn reviews(&self) -> Vec<Review> {
        self.lock().await.reviews.clone()
    }

    pub async fn review_attributes(&self, review_id: ReviewId) -> Option<ReviewAttributes> {
        self.lock().await.attributes.get(&review_id).cloned()
    }

    pub async fn visit_verification(&self, review_id: ReviewId) -> Option<VisitVerification> {
        self.lock().await.verifications.get(&review_id).cloned()
    }

    pub async fn checkins(&self) -> Vec<CheckIn> {
        self.lock().await.checkins.clone()
    }

    pub async fn helpful_votes(&self) -> Vec<HelpfulVote> {
        self.lock().await.helpful_votes.clone()
    }

    pub async fn abuse_reports(&self) -> Vec<AbuseReport> {
        self.lock().await.abuse_reports.clone()
    }

    pub async fn unknown_drink(&self, canonical: &str) -> Option<UnknownDrinkFormat> {
        self.lock().await.unknown_drinks.get(canonical).cloned()
    }

    pub async fn reputation_of(&self, user_id: UserId) -> Vec<ReputationEvent> {
        self.lock().await.reputation_events(user_id)
    }

    pub async fn photo_uploads(&self) -> Vec<PhotoUpload> {
        self.lock().await.uploads.clone()
    }

    pub async fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.lock().await.outbox.clone()
    }

    pub async fn inbox_events(&self) -> Vec<InboxEvent> {
        self.lock().await.inbox.clone()
    }

    pub async fn dlq_entries(&self) -> Vec<DlqEntry> {
        self.lock().await.dlq.clone()
    }

    pub async fn idempotency_slots(&self) -> usize {
        self.lock().await.idempotency.len()
    }
}

#[async_trait]
impl ReviewsStore for MemoryDatabase {
    async fn transaction<T: Send + 'static>(&self, work: UnitOfWork<T>) -> Result<T, Error> {
        let mut committed = self.lock().await;
        let mut tx = MemoryTx {
            tables: committed.clone(),
        };
        let value = work(&mut tx).await?;
        *committed = tx.tables;
        Ok(value)
    }
}

/// Working copy handed to a unit of work.
struct MemoryTx {
    tables: Tables,
}

fn slot_key(scope: &IdempotencyScope, key: &IdempotencyKey) -> (String, String) {
    (scope.as_str().to_owned(), key.as_ref().to_owned())
}

#[async_trait]
impl IdempotencyTx for MemoryTx {
    async fn insert_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        request_hash: &RequestHash,
        _now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let slot = slot_key(scope, key);
        if self.tables.idempotency.contains_key(&slot) {
            return Ok(false);
        }
        self.tables.idempotency.insert(
            slot,
            StoredIdempotency {
                request_hash: *request_hash,
                response_status: IN_FLIGHT_STATUS,
                response_body: json!({}),
            },
        );
        Ok(true)
    }

    async fn lock_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
    ) -> Result<Option<StoredIdempotency>, StoreError> {
        Ok(self.tables.idempotency.get(&slot_key(scope, key)).cloned())
    }

    async fn complete_idempotency_slot(
        &mut self,
        scope: &IdempotencyScope,
        key: &IdempotencyKey,
        response: &MutationResponse,
        _now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(slot) = self.tables.idempotency.get_mut(&slot_key(scope, key)) {
            slot.response_status = i32::from(response.status);
            slot.response_body = response.body.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogueTx for MemoryTx {
    async fn cafe_location(&mut self, cafe_id: CafeId) -> Result<Option<GeoPoint>, StoreError> {
        Ok(self.tables.cafes.get(&cafe_id).copied())
    }

    async fn find_active_drink(&mut self, drink_id: DrinkId) -> Result<Option<Drink>, StoreError> {
        Ok(self
            .tables
            .drinks
            .iter()
            .find(|drink| drink.id == drink_id && drink.is_active)
            .cloned())
    }

    async fn find_active_drink_by_name(
        &mut self,
        canonical: &str,
    ) -> Result<Option<Drink>, StoreError> {
        let mut active: Vec<&Drink> = self
            .tables
            .drinks
            .iter()
            .filter(|drink| drink.is_active)
            .collect();
        active.sort_by(|a, b| {
            a.popularity_rank
                .cmp(&b.popularity_rank)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(active
            .into_iter()
            .find(|drink| drink.matches_name(canonical))
            .cloned())
    }

    async fn record_unknown_drink(
        &mut self,
        canonical: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tables
            .unknown_drinks
            .entry(canonical.to_owned())
            .and_modify(|entry| entry.record_mention(user_id, now))
            .or_insert_with(|| UnknownDrinkFormat {
                name: canonical.to_owned(),
                mentions_count: 1,
                first_seen_at: now,
                last_seen_at: now,
                last_user_id: Some(user_id),
                status: UnknownDrinkStatus::New,
                mapped_drink_id: None,
            });
        Ok(())
    }
}

#[async_trait]
impl ReviewTx for MemoryTx {
    async fn find_review_for_update(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StoreError> {
        Ok(self.tables.review(review_id).cloned())
    }

    async fn find_user_review_for_update(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<Review>, StoreError> {
        Ok(self
            .tables
            .reviews
            .iter()
            .filter(|review| review.user_id == user_id && review.cafe_id == cafe_id)
            .max_by_key(|review| review.updated_at)
            .cloned())
    }

    async fn insert_review(&mut self, review: &Review) -> Result<(), StoreError> {
        let taken = self.tables.reviews.iter().any(|existing| {
            existing.id == review.id
                || (existing.user_id == review.user_id && existing.cafe_id == review.cafe_id)
        });
        if taken {
            return Err(StoreError::query("reviews unique constraint violated"));
        }
        self.tables.reviews.push(review.clone());
        Ok(())
    }

    async fn update_review(&mut self, review: &Review) -> Result<(), StoreError> {
        if let Some(stored) = self
            .tables
            .reviews
            .iter_mut()
            .find(|stored| stored.id == review.id)
        {
            *stored = review.clone();
        }
        Ok(())
    }

    async fn load_review_attributes(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<ReviewAttributes>, StoreError> {
        Ok(self.tables.attributes.get(&review_id).cloned())
    }

    async fn upsert_review_attributes(
        &mut self,
        attributes: &ReviewAttributes,
    ) -> Result<(), StoreError> {
        self.tables
            .attributes
            .insert(attributes.review_id, attributes.clone());
        Ok(())
    }

    async fn load_review_photos(&mut self, review_id: ReviewId) -> Result<Vec<String>, StoreError> {
        Ok(self
            .tables
            .review_photos
            .get(&review_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_review_photos(
        &mut self,
        review_id: ReviewId,
        photos: &[String],
    ) -> Result<(), StoreError> {
        if photos.is_empty() {
            self.tables.review_photos.remove(&review_id);
        } else {
            self.tables.review_photos.insert(review_id, photos.to_vec());
        }
        Ok(())
    }

    async fn summary_fingerprint_taken(
        &mut self,
        user_id: UserId,
        fingerprint: &str,
        excluding: Option<ReviewId>,
    ) -> Result<bool, StoreError> {
        let tables = &self.tables;
        Ok(tables.reviews.iter().any(|review| {
            review.user_id == user_id
                && review.status == ReviewStatus::Published
                && Some(review.id) != excluding
                && tables
                    .attributes
                    .get(&review.id)
                    .is_some_and(|attributes| attributes.summary_fingerprint == fingerprint)
        }))
    }
}

#[async_trait]
impl CheckInTx for MemoryTx {
    async fn find_started_checkin(
        &mut self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<CheckIn>, StoreError> {
        Ok(self
            .tables
            .checkins
            .iter()
            .filter(|checkin| {
                checkin.user_id == user_id
                    && checkin.cafe_id == cafe_id
                    && checkin.status == CheckInStatus::Started
            })
            .max_by_key(|checkin| checkin.started_at)
            .cloned())
    }

    async fn latest_checkin(&mut self, user_id: UserId) -> Result<Option<CheckIn>, StoreError> {
        Ok(self
            .tables
            .checkins
            .iter()
            .filter(|checkin| checkin.user_id == user_id)
            .max_by_key(|checkin| checkin.started_at)
            .cloned())
    }

    async fn insert_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError> {
        self.tables.checkins.push(checkin.clone());
        Ok(())
    }

    async fn lock_checkin(
        &mut self,
        checkin_id: CheckInId,
    ) -> Result<Option<CheckIn>, StoreError> {
        Ok(self
            .tables
            .checkins
            .iter()
            .find(|checkin| checkin.id == checkin_id)
            .cloned())
    }

    async fn update_checkin(&mut self, checkin: &CheckIn) -> Result<(), StoreError> {
        if let Some(stored) = self
            .tables
            .checkins
            .iter_mut()
            .find(|stored| stored.id == checkin.id)
        {
            *stored = checkin.clone();
        }
        Ok(())
    }

    async fn find_visit_verification(
        &mut self,
        review_id: ReviewId,
    ) -> Result<Option<VisitVerification>, StoreError> {
        Ok(self.tables.verifications.get(&review_id).cloned())
    }

    async fn upsert_visit_verification(
        &mut self,
        verification: &VisitVerification,
    ) -> Result<(), StoreError> {
        self.tables
            .verifications
            .entry(verification.review_id)
            .and_modify(|stored| {
                stored.confidence = verification.confidence;
                stored.verified_at = verification.verified_at;
                stored.dwell_seconds = verification.dwell_seconds;
            })
            .or_insert_with(|| verification.clone());
        Ok(())
    }
}

#[async_trait]
impl EngagementTx for MemoryTx {
    async fn insert_helpful_vote(&mut self, vote: &HelpfulVote) -> Result<bool, StoreError> {
        let duplicate = self.tables.helpful_votes.iter().any(|existing| {
            existing.review_id == vote.review_id && existing.voter_user_id == vote.voter_user_id
        });
        if duplicate {
            return Ok(false);
        }
        self.tables.helpful_votes.push(vote.clone());
        Ok(true)
    }

    async fn find_helpful_vote(
        &mut self,
        review_id: ReviewId,
        voter_user_id: UserId,
    ) -> Result<Option<HelpfulVote>, StoreError> {
        Ok(self
            .tables
            .helpful_votes
            .iter()
            .find(|vote| vote.review_id == review_id && vote.voter_user_id == voter_user_id)
            .cloned())
    }

    async fn insert_abuse_report(&mut self, report: &AbuseReport) -> Result<bool, StoreError> {
        let duplicate = self.tables.abuse_reports.iter().any(|existing| {
            existing.review_id == report.review_id
                && existing.reporter_user_id == report.reporter_user_id
        });
        if duplicate {
            return Ok(false);
        }
        self.tables.abuse_reports.push(report.clone());
        Ok(true)
    }

    async fn find_abuse_report(
        &mut self,
        review_id: ReviewId,
        reporter_user_id: UserId,
    ) -> Result<Option<AbuseReport>, StoreError> {
        Ok(self
            .tables
            .abuse_reports
            .iter()
            .find(|report| {
                report.review_id == review_id && report.reporter_user_id == reporter_user_id
            })
            .cloned())
    }

    async fn lock_abuse_report(
        &mut self,
        report_id: ReportId,
    ) -> Result<Option<AbuseReport>, StoreError> {
        Ok(self
            .tables
            .abuse_reports
            .iter()
            .find(|report| report.id == report_id)
            .cloned())
    }

    async fn update_abuse_report(&mut self, report: &AbuseReport) -> Result<(), StoreError> {
        if let Some(stored) = self
            .tables
            .abuse_reports
            .iter_mut()
            .find(|stored| stored.id == report.id)
        {
            *stored = report.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl ReputationTx for MemoryTx {
    async fn reputation_events(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<ReputationEvent>, StoreError> {
        Ok(self.tables.reputation_events(user_id))
    }

    async fn append_reputation_event(
        &mut self,
        event: &NewReputationEvent,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.append_reputation_event(event))
    }
}

#[async_trait]
impl PhotoUploadTx for MemoryTx {
    async fn find_photo_upload_by_key(
        &mut self,
        user_id: UserId,
        temp_object_key: &str,
    ) -> Result<Option<PhotoUpload>, StoreError> {
        Ok(self
            .tables
            .uploads
            .iter()
            .find(|upload| upload.user_id == user_id && upload.temp_object_key == temp_object_key)
            .cloned())
    }

    async fn insert_photo_upload(&mut self, upload: &PhotoUpload) -> Result<(), StoreError> {
        self.tables.uploads.push(upload.clone());
        Ok(())
    }
}

#[async_trait]
impl OutboxTx for MemoryTx {
    async fn enqueue_event(
        &mut self,
        event: &NewDomainEvent,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let duplicate = self
            .tables
            .outbox
            .iter()
            .any(|existing| existing.dedupe_key == event.dedupe_key);
        if duplicate {
            return Ok(false);
        }
        self.tables.outbox.push(OutboxEvent {
            id: event.id,
            event_type: event.event_type.as_str().to_owned(),
            aggregate_type: event.aggregate_type.as_str().to_owned(),
            aggregate_id: event.aggregate_id,
            dedupe_key: event.dedupe_key.clone(),
            payload: event.payload.clone(),
            status: EventStatus::Pending,
            attempts: 0,
            available_at: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }
}
