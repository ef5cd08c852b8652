//! Helpful votes, abuse reports and moderator confirmation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::model::{AbuseReason, AbuseReport, AbuseStatus, HelpfulVote, helpful_vote_weight};
use crate::domain::events::{AbuseConfirmed, EventBody, HelpfulAdded};
use crate::domain::idempotency::{
    IdempotencyKey, IdempotentRequest, IdempotentResponse, MutationResponse, ScopeKind,
    run_idempotent,
};
use crate::domain::ports::{ReviewsStore, ReviewsTx};
use crate::domain::reputation::compute_score;
use crate::domain::reviews::Review;
use crate::domain::{Actor, Error, ReportId, ReviewId, VoteId};

/// Longest free-text explanation accepted on a report.
pub const ABUSE_DETAILS_MAX_CHARS: usize = 1000;

/// Body returned by a helpful vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpfulVoteResponse {
    pub vote_id: VoteId,
    pub review_id: ReviewId,
    pub weight: f64,
    pub already_exists: bool,
    pub created_at: DateTime<Utc>,
}

impl HelpfulVoteResponse {
    fn from_vote(vote: &HelpfulVote, already_exists: bool) -> Self {
        Self {
            vote_id: vote.id,
            review_id: vote.review_id,
            weight: vote.weight,
            already_exists,
            created_at: vote.created_at,
        }
    }
}

/// Body of `POST /reviews/{id}/abuse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseReportRequest {
    pub reason: AbuseReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body returned by report and confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseReportResponse {
    pub report_id: ReportId,
    pub review_id: ReviewId,
    pub reason: AbuseReason,
    pub status: AbuseStatus,
    pub already_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl AbuseReportResponse {
    fn from_report(report: &AbuseReport, already_exists: bool) -> Self {
        Self {
            report_id: report.id,
            review_id: report.review_id,
            reason: report.reason,
            status: report.status,
            already_exists,
            confirmed_at: report.confirmed_at,
        }
    }
}

/// Votes and reports on other users' reviews.
pub struct EngagementService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for EngagementService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

async fn published_review(tx: &mut dyn ReviewsTx, review_id: ReviewId) -> Result<Review, Error> {
    let review = tx
        .find_review_for_update(review_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("review {review_id} not found")))?;
    if !review.is_published() {
        return Err(Error::not_found(format!("review {review_id} not found")));
    }
    Ok(review)
}

fn normalize_details(details: Option<&str>) -> Result<Option<String>, Error> {
    let Some(trimmed) = details.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > ABUSE_DETAILS_MAX_CHARS {
        return Err(Error::invalid_argument(format!(
            "details must be at most {ABUSE_DETAILS_MAX_CHARS} characters"
        ))
        .with_details(json!({ "field": "details" })));
    }
    Ok(Some(trimmed.to_owned()))
}

impl<S> EngagementService<S>
where
    S: ReviewsStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Mark a review helpful, weighted by the voter's reputation.
    pub async fn vote_helpful(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
    ) -> Result<IdempotentResponse, Error> {
        let idempotent = IdempotentRequest::new(
            ScopeKind::VoteHelpful,
            actor.user_id,
            key,
            &json!({ "review_id": review_id }),
        )?;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let review = published_review(&mut *tx, review_id).await?;
                if review.user_id == actor.user_id {
                    return Err(Error::forbidden("you cannot vote for your own review"));
                }
                if let Some(existing) = tx.find_helpful_vote(review_id, actor.user_id).await? {
                    return MutationResponse::ok(&HelpfulVoteResponse::from_vote(&existing, true));
                }

                let history = tx.reputation_events(actor.user_id).await?;
                let vote = HelpfulVote {
                    id: VoteId::random(),
                    review_id,
                    voter_user_id: actor.user_id,
                    weight: helpful_vote_weight(compute_score(&history, now)),
                    created_at: now,
                };
                if !tx.insert_helpful_vote(&vote).await? {
                    let existing = tx
                        .find_helpful_vote(review_id, actor.user_id)
                        .await?
                        .ok_or_else(|| Error::internal("helpful vote vanished after conflict"))?;
                    return MutationResponse::ok(&HelpfulVoteResponse::from_vote(&existing, true));
                }

                let event = EventBody::VoteHelpfulAdded(HelpfulAdded {
                    vote_id: vote.id,
                    review_id,
                    cafe_id: review.cafe_id,
                    voter_user_id: actor.user_id,
                    author_user_id: review.user_id,
                    weight: vote.weight,
                })
                .into_event(format!("vote-helpful:{review_id}:{}", actor.user_id))?;
                tx.enqueue_event(&event, now).await?;
                info!(%review_id, vote_id = %vote.id, weight = vote.weight, "helpful vote recorded");

                MutationResponse::created(&HelpfulVoteResponse::from_vote(&vote, false))
            })
        })
        .await
    }

    /// File an abuse report; one per (review, reporter).
    pub async fn report_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        review_id: ReviewId,
        request: AbuseReportRequest,
    ) -> Result<IdempotentResponse, Error> {
        let details = normalize_details(request.details.as_deref())?;
        let idempotent = IdempotentRequest::new(
            ScopeKind::AbuseReport,
            actor.user_id,
            key,
            &json!({ "review_id": review_id, "reason": request.reason, "details": &details }),
        )?;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let review = published_review(&mut *tx, review_id).await?;
                if review.user_id == actor.user_id {
                    return Err(Error::forbidden("you cannot report your own review"));
                }
                if let Some(existing) = tx.find_abuse_report(review_id, actor.user_id).await? {
                    return MutationResponse::ok(&AbuseReportResponse::from_report(
                        &existing, true,
                    ));
                }
                let report = AbuseReport {
                    id: ReportId::random(),
                    review_id,
                    reporter_user_id: actor.user_id,
                    reason: request.reason,
                    details,
                    status: AbuseStatus::Open,
                    confirmed_by: None,
                    confirmed_at: None,
                    created_at: now,
                };
                if !tx.insert_abuse_report(&report).await? {
                    let existing = tx
                        .find_abuse_report(review_id, actor.user_id)
                        .await?
                        .ok_or_else(|| Error::internal("abuse report vanished after conflict"))?;
                    return MutationResponse::ok(&AbuseReportResponse::from_report(
                        &existing, true,
                    ));
                }
                info!(%review_id, report_id = %report.id, reason = report.reason.as_str(), "abuse reported");
                MutationResponse::created(&AbuseReportResponse::from_report(&report, false))
            })
        })
        .await
    }

    /// Moderator confirmation; the event is enqueued exactly once.
    pub async fn confirm_abuse(
        &self,
        actor: Actor,
        key: IdempotencyKey,
        report_id: ReportId,
    ) -> Result<IdempotentResponse, Error> {
        if !actor.can_moderate() {
            return Err(Error::forbidden("only moderators may confirm reports"));
        }
        let idempotent = IdempotentRequest::new(
            ScopeKind::AbuseConfirm,
            actor.user_id,
            key,
            &json!({ "report_id": report_id }),
        )?;
        let now = self.clock.utc();

        run_idempotent(self.store.as_ref(), idempotent, now, move |tx| {
            Box::pin(async move {
                let mut report = tx
                    .lock_abuse_report(report_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("report {report_id} not found")))?;
                match report.status {
                    AbuseStatus::Confirmed => {
                        return MutationResponse::ok(&AbuseReportResponse::from_report(
                            &report, true,
                        ));
                    }
                    AbuseStatus::Dismissed => {
                        return Err(Error::conflict("the report was dismissed"));
                    }
                    AbuseStatus::Open => {}
                }
                let review = tx
                    .find_review_for_update(report.review_id)
                    .await?
                    .ok_or_else(|| Error::not_found("reported review not found"))?;

                report.status = AbuseStatus::Confirmed;
                report.confirmed_by = Some(actor.user_id);
                report.confirmed_at = Some(now);
                tx.update_abuse_report(&report).await?;

                let event = EventBody::AbuseConfirmed(AbuseConfirmed {
                    abuse_report_id: report_id,
                    review_id: review.id,
                    cafe_id: review.cafe_id,
                    author_user_id: review.user_id,
                })
                .into_event(format!("abuse-confirmed:{report_id}"))?;
                tx.enqueue_event(&event, now).await?;
                info!(%report_id, review_id = %review.id, moderator = %actor.user_id, "abuse confirmed");

                MutationResponse::ok(&AbuseReportResponse::from_report(&report, false))
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some("   "), None)]
    #[case(Some("  spam link "), Some("spam link"))]
    fn details_are_trimmed(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let normalized = normalize_details(raw).expect("valid details");
        assert_eq!(normalized.as_deref(), expected);
    }

    #[rstest]
    fn overlong_details_are_rejected() {
        let raw = "x".repeat(ABUSE_DETAILS_MAX_CHARS + 1);
        assert!(normalize_details(Some(&raw)).is_err());
    }

    #[rstest]
    fn vote_response_mirrors_the_vote() {
        let vote = HelpfulVote {
            id: VoteId::random(),
            review_id: ReviewId::random(),
            voter_user_id: UserId::random(),
            weight: 1.2,
            created_at: Utc::now(),
        };
        let response = HelpfulVoteResponse::from_vote(&vote, false);
        assert_eq!(response.vote_id, vote.id);
        assert!(!response.already_exists);
    }
}
