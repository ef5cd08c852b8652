//! Review write path: publish, partial update and moderator removal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::model::{Review, ReviewAttributes, ReviewStatus};
use super::validation::{
    PublishReviewRequest, UpdateReviewRequest, ValidatedReview, merge_update, validate_review,
};
use crate::domain::drinks::{DrinkResolution, canonicalize_drink_name};
use crate::domain::events::{EventBody, EventType, ReviewChanged, envelope_dedupe_key};
use crate::domain::idempotency::{
    IdempotencyKey, IdempotentRequest, IdempotentResponse, MutationResponse, ScopeKind,
    run_idempotent,
};
use crate::domain::ports::{ReviewsStore, ReviewsTx};
use crate::domain::rate_limit::ReviewRateLimits;
use crate::domain::reputation::{NewReputationEvent, REVIEW_REMOVED_POINTS, ReputationEventType};
use crate::domain::{Actor, CafeId, DrinkId, Error, ReviewId, UserId};

/// Body returned by publish and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewWriteResponse {
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub user_id: UserId,
    pub status: ReviewStatus,
    pub event_type: EventType,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drink_id: Option<DrinkId>,
    pub drink_name: String,
    pub taste_tags: Vec<String>,
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `DELETE /reviews/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReviewRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body returned by removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRemovedResponse {
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub status: ReviewStatus,
    pub removed_at: DateTime<Utc>,
}

/// Where the outbox event of a write gets its dedupe key from.
struct EventKey {
    scope: String,
    key: String,
}

impl EventKey {
    fn for_request(request: &IdempotentRequest) -> Self {
        Self {
            scope: request.scope.as_str().to_owned(),
            key: request.key.as_ref().to_owned(),
        }
    }

    fn dedupe(&self, event_type: EventType) -> String {
        envelope_dedupe_key(&self.scope, &self.key, event_type)
    }
}

/// Review mutations.
pub struct ReviewsService<S> {
    store: Arc<S>,
    limits: Arc<ReviewRateLimits>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for ReviewsService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            limits: Arc::clone(&self.limits),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> ReviewsService<S>
where
    S: ReviewsStore + 'static,
{
    pub fn new(store: Arc<S>, limits: Arc<ReviewRateLimits>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            limits,
            clock,
        }
    }

    /// Create the caller's review of a café, or republish it.
    ///
    /// Answers `201` on first publication and `200` when an existing
    /// (user, café) review is overwritten.
    pub async fn publish(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        request: PublishReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        let validated = validate_review(&request)?;
        let idempotent =
            IdempotentRequest::new(ScopeKind::ReviewPublish, actor.user_id, key, &request)?;
        let event_key = EventKey::for_request(&idempotent);
        let limits = Arc::clone(&self.limits);
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let existing = tx
                    .find_user_review_for_update(actor.user_id, validated.cafe_id)
                    .await?;
                let limiter = if existing.is_some() {
                    &limits.update
                } else {
                    &limits.create
                };
                let response =
                    persist_review(tx, actor.user_id, validated, existing, &event_key, now)
                        .await?;
                // Last fallible step: rejected writes must not spend a token.
                limiter.acquire(actor.user_id, now)?;
                let status = if response.event_type == EventType::ReviewCreated {
                    201
                } else {
                    200
                };
                MutationResponse::new(status, &response)
            })
        })
        .await
    }

    /// Apply a partial update to the caller's own review.
    pub async fn update(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        patch: UpdateReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        if patch.is_empty() {
            return Err(Error::invalid_argument("update must change at least one field"));
        }
        let idempotent = IdempotentRequest::new(
            ScopeKind::ReviewUpdate,
            actor.user_id,
            key,
            &json!({ "review_id": review_id, "patch": &patch }),
        )?;
        let event_key = EventKey::for_request(&idempotent);
        let limits = Arc::clone(&self.limits);
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let review = tx
                    .find_review_for_update(review_id)
                    .await?
                    .ok_or_else(|| review_not_found(review_id))?;
                if review.user_id != actor.user_id {
                    return Err(Error::forbidden("only the author may edit a review"));
                }
                if !review.is_published() {
                    return Err(Error::conflict("a removed review cannot be edited"));
                }
                let current = load_request(&mut *tx, &review).await?;
                let validated = validate_review(&merge_update(current, &patch))?;
                let response =
                    persist_review(tx, actor.user_id, validated, Some(review), &event_key, now)
                        .await?;
                limits.update.acquire(actor.user_id, now)?;
                MutationResponse::ok(&response)
            })
        })
        .await
    }

    /// Soft-remove a review and penalise its author.
    pub async fn remove(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: RemoveReviewRequest,
    ) -> Result<IdempotentResponse, Error> {
        if !actor.can_moderate() {
            return Err(Error::forbidden("only moderators may remove reviews"));
        }
        let idempotent = IdempotentRequest::new(
            ScopeKind::ReviewRemove,
            actor.user_id,
            key,
            &json!({ "review_id": review_id, "reason": &request.reason }),
        )?;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let mut review = tx
                    .find_review_for_update(review_id)
                    .await?
                    .ok_or_else(|| review_not_found(review_id))?;
                if review.status == ReviewStatus::Removed {
                    return MutationResponse::ok(&ReviewRemovedResponse {
                        review_id,
                        cafe_id: review.cafe_id,
                        status: review.status,
                        removed_at: review.updated_at,
                    });
                }
                review.status = ReviewStatus::Removed;
                review.updated_at = now;
                tx.update_review(&review).await?;

                let dedupe = format!(
                    "review-removed:{review_id}:{}",
                    now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros())
                );
                let event = EventBody::ReviewUpdated(ReviewChanged {
                    review_id,
                    cafe_id: review.cafe_id,
                    user_id: review.user_id,
                    removed: true,
                })
                .into_event(dedupe)?;
                tx.enqueue_event(&event, now).await?;

                tx.append_reputation_event(&NewReputationEvent {
                    user_id: review.user_id,
                    event_type: ReputationEventType::ReviewRemoved,
                    source_id: *review_id.as_uuid(),
                    points: REVIEW_REMOVED_POINTS,
                    metadata: json!({
                        "moderator_id": actor.user_id,
                        "reason": request.reason,
                    }),
                    created_at: now,
                })
                .await?;

                info!(%review_id, moderator = %actor.user_id, "review removed");
                MutationResponse::ok(&ReviewRemovedResponse {
                    review_id,
                    cafe_id: review.cafe_id,
                    status: review.status,
                    removed_at: now,
                })
            })
        })
        .await
    }
}

fn review_not_found(review_id: ReviewId) -> Error {
    Error::not_found(format!("review {review_id} not found"))
}

/// Rebuild the full request body of a stored review.
async fn load_request(
    tx: &mut dyn ReviewsTx,
    review: &Review,
) -> Result<PublishReviewRequest, Error> {
    let attributes = tx.load_review_attributes(review.id).await?;
    let photos = tx.load_review_photos(review.id).await?;
    let (drink_id, drink_name, taste_tags) = attributes.map_or((None, None, Vec::new()), |attrs| {
        (attrs.drink_id, Some(attrs.drink_name), attrs.taste_tags)
    });
    Ok(PublishReviewRequest {
        cafe_id: review.cafe_id,
        rating: i64::from(review.rating.get()),
        drink_id,
        drink_name,
        summary: review.summary.clone(),
        taste_tags,
        photos,
    })
}

/// Resolve a drink against the active catalogue, recording unknown names.
async fn resolve_drink(
    tx: &mut dyn ReviewsTx,
    review: &ValidatedReview,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<DrinkResolution, Error> {
    if let Some(drink_id) = review.drink.drink_id {
        if let Some(drink) = tx.find_active_drink(drink_id).await? {
            return Ok(DrinkResolution::Catalogue(drink));
        }
    }
    let Some(display_name) = review.drink.drink_name.clone() else {
        return Err(Error::conflict("drink is not in the active catalogue")
            .with_details(json!({ "field": "drink_id" })));
    };
    let canonical = canonicalize_drink_name(&display_name);
    if let Some(drink) = tx.find_active_drink_by_name(&canonical).await? {
        return Ok(DrinkResolution::Catalogue(drink));
    }
    tx.record_unknown_drink(&canonical, user_id, now).await?;
    Ok(DrinkResolution::Unknown {
        display_name,
        canonical,
    })
}

/// Shared tail of publish and update.
async fn persist_review(
    tx: &mut dyn ReviewsTx,
    user_id: UserId,
    review: ValidatedReview,
    existing: Option<Review>,
    event_key: &EventKey,
    now: DateTime<Utc>,
) -> Result<ReviewWriteResponse, Error> {
    if tx.cafe_location(review.cafe_id).await?.is_none() {
        return Err(Error::not_found(format!("cafe {} not found", review.cafe_id)));
    }
    let drink = resolve_drink(&mut *tx, &review, user_id, now).await?;

    let excluding = existing.as_ref().map(|row| row.id);
    if tx
        .summary_fingerprint_taken(user_id, &review.summary_fingerprint, excluding)
        .await?
    {
        return Err(Error::conflict(
            "this summary duplicates another of your reviews",
        ));
    }

    let (stored, event_type) = match existing {
        Some(current) => {
            let updated = Review {
                rating: review.rating,
                summary: review.summary.clone(),
                status: ReviewStatus::Published,
                updated_at: now,
                ..current
            };
            tx.update_review(&updated).await?;
            (updated, EventType::ReviewUpdated)
        }
        None => {
            let created = Review {
                id: ReviewId::random(),
                user_id,
                cafe_id: review.cafe_id,
                rating: review.rating,
                summary: review.summary.clone(),
                status: ReviewStatus::Published,
                created_at: now,
                updated_at: now,
            };
            tx.insert_review(&created).await?;
            (created, EventType::ReviewCreated)
        }
    };

    let photo_count = u32::try_from(review.photos.len())
        .map_err(|_| Error::invalid_argument("too many photos"))?;
    tx.upsert_review_attributes(&ReviewAttributes {
        review_id: stored.id,
        drink_id: drink.drink_id(),
        drink_name: drink.drink_name().to_owned(),
        taste_tags: review.taste_tags.clone(),
        summary_length: review.summary_length,
        summary_fingerprint: review.summary_fingerprint.clone(),
        photo_count,
    })
    .await?;
    tx.replace_review_photos(stored.id, &review.photos).await?;

    let change = ReviewChanged {
        review_id: stored.id,
        cafe_id: stored.cafe_id,
        user_id,
        removed: false,
    };
    let body = if event_type == EventType::ReviewCreated {
        EventBody::ReviewCreated(change)
    } else {
        EventBody::ReviewUpdated(change)
    };
    let event = body.into_event(event_key.dedupe(event_type))?;
    tx.enqueue_event(&event, now).await?;

    info!(review_id = %stored.id, cafe_id = %stored.cafe_id, %event_type, "review written");
    Ok(ReviewWriteResponse {
        review_id: stored.id,
        cafe_id: stored.cafe_id,
        user_id,
        status: stored.status,
        event_type,
        rating: stored.rating.get(),
        drink_id: drink.drink_id(),
        drink_name: drink.drink_name().to_owned(),
        taste_tags: review.taste_tags,
        photos: review.photos,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    })
}
