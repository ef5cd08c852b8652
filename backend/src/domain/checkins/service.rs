//! Check-in start and visit verification.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::geo::{GeoPoint, ip_prefix, user_agent_hash};
use super::model::{CheckIn, CheckInStatus, Confidence, VisitVerification};
use super::rules::{CheckInPolicy, classify_confidence, risk_flags};
use crate::domain::events::{EventBody, EventType, VisitVerified, envelope_dedupe_key};
use crate::domain::idempotency::{
    IdempotencyKey, IdempotentRequest, IdempotentResponse, MutationResponse, ScopeKind,
    run_idempotent,
};
use crate::domain::ports::ReviewsStore;
use crate::domain::{Actor, CafeId, CheckInId, Error, ReviewId, VerificationId};

/// Body of `POST /cafes/{id}/check-in/start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartCheckInRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Body of `POST /reviews/{id}/visit/verify`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifyVisitRequest {
    pub checkin_id: CheckInId,
    pub lat: f64,
    pub lng: f64,
}

/// Request metadata stored, hashed or truncated, on new check-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip: Option<IpAddr>,
}

/// Body returned by check-in start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub checkin_id: CheckInId,
    pub cafe_id: CafeId,
    pub status: CheckInStatus,
    pub started_at: DateTime<Utc>,
    pub can_verify_after: DateTime<Utc>,
    pub distance_m: f64,
    /// True when an already running check-in was returned.
    pub existing: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_flags: Vec<String>,
}

/// Body returned by visit verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyVisitResponse {
    pub verification_id: VerificationId,
    pub review_id: ReviewId,
    pub checkin_id: CheckInId,
    /// Confidence kept on the review after this attempt.
    pub confidence: Confidence,
    /// Confidence earned by this attempt alone.
    pub attempt_confidence: Confidence,
    pub dwell_seconds: i64,
    pub distance_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_flags: Vec<String>,
}

/// Geofenced check-ins and the visit verifications they back.
pub struct CheckInService<S> {
    store: Arc<S>,
    policy: CheckInPolicy,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for CheckInService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            clock: Arc::clone(&self.clock),
        }
    }
}

fn coordinates(lat: f64, lng: f64) -> Result<GeoPoint, Error> {
    GeoPoint::new(lat, lng).map_err(|err| Error::invalid_argument(err.to_string()))
}

impl<S> CheckInService<S>
where
    S: ReviewsStore + 'static,
{
    pub fn new(store: Arc<S>, policy: CheckInPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// Start (or resume) a check-in at a café.
    pub async fn start(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        cafe_id: CafeId,
        request: StartCheckInRequest,
        client: ClientContext,
    ) -> Result<IdempotentResponse, Error> {
        let point = coordinates(request.lat, request.lng)?;
        let idempotent = IdempotentRequest::new(
            ScopeKind::CheckInStart,
            actor.user_id,
            key,
            &json!({ "cafe_id": cafe_id, "lat": request.lat, "lng": request.lng }),
        )?;
        let policy = self.policy;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let cafe = tx
                    .cafe_location(cafe_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("cafe {cafe_id} not found")))?;
                let distance_m = cafe.distance_m(&point);
                let mut flags = Vec::new();
                policy.check_distance(distance_m, actor.is_admin(), &mut flags)?;

                if let Some(active) = tx.find_started_checkin(actor.user_id, cafe_id).await? {
                    return MutationResponse::ok(&CheckInResponse {
                        checkin_id: active.id,
                        cafe_id,
                        status: active.status,
                        started_at: active.started_at,
                        can_verify_after: policy.can_verify_after(active.started_at),
                        distance_m: active.start_distance_m,
                        existing: true,
                        risk_flags: active.risk_flags,
                    });
                }

                let previous = tx.latest_checkin(actor.user_id).await?;
                policy.check_previous(
                    previous.as_ref(),
                    cafe_id,
                    &point,
                    now,
                    actor.is_admin(),
                    &mut flags,
                )?;

                let checkin = CheckIn {
                    id: CheckInId::random(),
                    user_id: actor.user_id,
                    cafe_id,
                    status: CheckInStatus::Started,
                    started_at: now,
                    start: point,
                    start_distance_m: distance_m,
                    verified_at: None,
                    verified_review_id: None,
                    verify_point: None,
                    verify_distance_m: None,
                    dwell_seconds: None,
                    confidence: None,
                    risk_flags: flags,
                    user_agent_hash: client.user_agent.as_deref().and_then(user_agent_hash),
                    ip_prefix: client.ip.map(ip_prefix),
                };
                tx.insert_checkin(&checkin).await?;
                info!(checkin_id = %checkin.id, %cafe_id, user_id = %actor.user_id, "check-in started");

                MutationResponse::ok(&CheckInResponse {
                    checkin_id: checkin.id,
                    cafe_id,
                    status: checkin.status,
                    started_at: now,
                    can_verify_after: policy.can_verify_after(now),
                    distance_m,
                    existing: false,
                    risk_flags: checkin.risk_flags,
                })
            })
        })
        .await
    }

    /// Verify the caller's visit for one of their reviews.
    ///
    /// Confidence never decreases across attempts. An attempt earning
    /// `none` is recorded but leaves the check-in open for another try.
    pub async fn verify(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: VerifyVisitRequest,
    ) -> Result<IdempotentResponse, Error> {
        let point = coordinates(request.lat, request.lng)?;
        let idempotent = IdempotentRequest::new(
            ScopeKind::CheckInVerify,
            actor.user_id,
            key,
            &json!({
                "review_id": review_id,
                "checkin_id": request.checkin_id,
                "lat": request.lat,
                "lng": request.lng,
            }),
        )?;
        let dedupe_key = envelope_dedupe_key(
            idempotent.scope.as_str(),
            idempotent.key.as_ref(),
            EventType::VisitVerified,
        );
        let policy = self.policy;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let review = tx
                    .find_review_for_update(review_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("review {review_id} not found")))?;
                if review.user_id != actor.user_id {
                    return Err(Error::forbidden("only the author may verify a visit"));
                }
                if !review.is_published() {
                    return Err(Error::conflict("the review is not published"));
                }

                let mut checkin = tx
                    .lock_checkin(request.checkin_id)
                    .await?
                    .ok_or_else(|| Error::not_found("check-in not found"))?;
                if checkin.user_id != actor.user_id {
                    return Err(Error::forbidden("the check-in belongs to another user"));
                }
                if checkin.status != CheckInStatus::Started {
                    return Err(Error::conflict("the check-in was already used"));
                }
                if checkin.cafe_id != review.cafe_id {
                    return Err(Error::conflict("the check-in is for a different café"));
                }

                let mut flags = checkin.risk_flags.clone();
                let dwell = now - checkin.started_at;
                if dwell < policy.min_dwell {
                    if actor.is_admin() {
                        flags.push(risk_flags::ADMIN_DWELL_BYPASS.to_owned());
                    } else {
                        let retry_after = (policy.min_dwell - dwell).num_seconds().max(1);
                        return Err(Error::conflict("stay a little longer before verifying")
                            .with_details(json!({
                                "can_verify_after": policy.can_verify_after(checkin.started_at),
                                "retry_after_seconds": retry_after,
                            })));
                    }
                }

                let cafe = tx
                    .cafe_location(review.cafe_id)
                    .await?
                    .ok_or_else(|| Error::not_found("cafe not found"))?;
                let distance_m = cafe.distance_m(&point);
                if distance_m > policy.radius_m {
                    flags.push(risk_flags::VERIFY_OUTSIDE_GEOFENCE.to_owned());
                }
                let attempt_confidence = classify_confidence(dwell, distance_m, actor.is_admin());
                let dwell_seconds = dwell.num_seconds().max(0);

                let existing = tx.find_visit_verification(review_id).await?;
                let verification = VisitVerification::merge_attempt(
                    existing,
                    VisitVerification {
                        id: VerificationId::random(),
                        review_id,
                        user_id: actor.user_id,
                        cafe_id: review.cafe_id,
                        confidence: attempt_confidence,
                        verified_at: attempt_confidence.is_verified().then_some(now),
                        dwell_seconds,
                    },
                );
                tx.upsert_visit_verification(&verification).await?;

                checkin.verify_point = Some(point);
                checkin.verify_distance_m = Some(distance_m);
                checkin.dwell_seconds = Some(dwell_seconds);
                checkin.confidence = Some(attempt_confidence);
                checkin.risk_flags = flags;
                if attempt_confidence.is_verified() {
                    checkin.status = CheckInStatus::Verified;
                    checkin.verified_at = Some(now);
                    checkin.verified_review_id = Some(review_id);
                }
                tx.update_checkin(&checkin).await?;

                if attempt_confidence.is_verified() {
                    let event = EventBody::VisitVerified(VisitVerified {
                        visit_verification_id: verification.id,
                        review_id,
                        cafe_id: review.cafe_id,
                        user_id: actor.user_id,
                        confidence: verification.confidence,
                        admin_verified: actor.is_admin(),
                    })
                    .into_event(dedupe_key)?;
                    tx.enqueue_event(&event, now).await?;
                }
                info!(
                    %review_id,
                    checkin_id = %checkin.id,
                    confidence = %attempt_confidence,
                    "visit verification attempt"
                );

                MutationResponse::ok(&VerifyVisitResponse {
                    verification_id: verification.id,
                    review_id,
                    checkin_id: checkin.id,
                    confidence: verification.confidence,
                    attempt_confidence,
                    dwell_seconds,
                    distance_m,
                    verified_at: verification.verified_at,
                    risk_flags: checkin.risk_flags,
                })
            })
        })
        .await
    }
}
