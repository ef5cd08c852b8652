//! Typed event bodies. Storage keeps them as flat JSON objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{AggregateType, EventType, NewDomainEvent};
use crate::domain::checkins::Confidence;
use crate::domain::{
    CafeId, Error, EventId, PhotoUploadId, ReportId, ReviewId, UserId, VerificationId, VoteId,
};

/// `review.created` / `review.updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewChanged {
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

/// `vote.helpful_added`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpfulAdded {
    pub vote_id: VoteId,
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub voter_user_id: UserId,
    pub author_user_id: UserId,
    pub weight: f64,
}

/// `visit.verified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitVerified {
    pub visit_verification_id: VerificationId,
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub user_id: UserId,
    pub confidence: Confidence,
    #[serde(default)]
    pub admin_verified: bool,
}

/// `abuse.confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseConfirmed {
    pub abuse_report_id: ReportId,
    pub review_id: ReviewId,
    pub cafe_id: CafeId,
    pub author_user_id: UserId,
}

/// `review_photo.process_requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoProcessRequested {
    pub photo_upload_id: PhotoUploadId,
    pub user_id: UserId,
}

/// Decoded event body, one variant per event type.
#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    ReviewCreated(ReviewChanged),
    ReviewUpdated(ReviewChanged),
    VoteHelpfulAdded(HelpfulAdded),
    VisitVerified(VisitVerified),
    AbuseConfirmed(AbuseConfirmed),
    PhotoProcessRequested(PhotoProcessRequested),
}

impl EventBody {
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::ReviewCreated(_) => EventType::ReviewCreated,
            Self::ReviewUpdated(_) => EventType::ReviewUpdated,
            Self::VoteHelpfulAdded(_) => EventType::VoteHelpfulAdded,
            Self::VisitVerified(_) => EventType::VisitVerified,
            Self::AbuseConfirmed(_) => EventType::AbuseConfirmed,
            Self::PhotoProcessRequested(_) => EventType::ReviewPhotoProcessRequested,
        }
    }

    /// Decode a stored payload according to its event type.
    pub fn decode(event_type: &str, payload: &Value) -> Result<Self, Error> {
        let event_type: EventType = event_type
            .parse()
            .map_err(|err: super::model::UnknownEventType| Error::internal(err.to_string()))?;
        let body = match event_type {
            EventType::ReviewCreated => Self::ReviewCreated(from_payload(payload)?),
            EventType::ReviewUpdated => Self::ReviewUpdated(from_payload(payload)?),
            EventType::VoteHelpfulAdded => Self::VoteHelpfulAdded(from_payload(payload)?),
            EventType::VisitVerified => Self::VisitVerified(from_payload(payload)?),
            EventType::AbuseConfirmed => Self::AbuseConfirmed(from_payload(payload)?),
            EventType::ReviewPhotoProcessRequested => {
                Self::PhotoProcessRequested(from_payload(payload)?)
            }
        };
        Ok(body)
    }

    /// Build the outbox row for this body.
    pub fn into_event(self, dedupe_key: impl Into<String>) -> Result<NewDomainEvent, Error> {
        let event_type = self.event_type();
        let (aggregate_type, aggregate_id, payload) = match &self {
            Self::ReviewCreated(body) | Self::ReviewUpdated(body) => {
                (AggregateType::Cafe, *body.cafe_id.as_uuid(), to_payload(body)?)
            }
            Self::VoteHelpfulAdded(body) => {
                (AggregateType::Cafe, *body.cafe_id.as_uuid(), to_payload(body)?)
            }
            Self::VisitVerified(body) => {
                (AggregateType::Cafe, *body.cafe_id.as_uuid(), to_payload(body)?)
            }
            Self::AbuseConfirmed(body) => {
                (AggregateType::Cafe, *body.cafe_id.as_uuid(), to_payload(body)?)
            }
            Self::PhotoProcessRequested(body) => {
                (AggregateType::User, *body.user_id.as_uuid(), to_payload(body)?)
            }
        };
        Ok(NewDomainEvent {
            id: EventId::random(),
            event_type,
            aggregate_type,
            aggregate_id,
            dedupe_key: dedupe_key.into(),
            payload,
        })
    }

    /// Café whose snapshot this event affects, if any.
    #[must_use]
    pub const fn cafe_id(&self) -> Option<CafeId> {
        match self {
            Self::ReviewCreated(body) | Self::ReviewUpdated(body) => Some(body.cafe_id),
            Self::VoteHelpfulAdded(body) => Some(body.cafe_id),
            Self::VisitVerified(body) => Some(body.cafe_id),
            Self::AbuseConfirmed(body) => Some(body.cafe_id),
            Self::PhotoProcessRequested(_) => None,
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, Error> {
    serde_json::from_value(payload.clone())
        .map_err(|err| Error::internal(format!("malformed event payload: {err}")))
}

fn to_payload<T: Serialize>(body: &T) -> Result<Value, Error> {
    serde_json::to_value(body)
        .map_err(|err| Error::internal(format!("failed to encode event payload: {err}")))
}

/// Dedupe key for events emitted inside an idempotency envelope.
///
/// # Examples
/// ```
/// use backend::domain::events::{EventType, envelope_dedupe_key};
///
/// assert_eq!(
///     envelope_dedupe_key("review.publish:u1", "k1", EventType::ReviewCreated),
///     "review.publish:u1:k1:review.created",
/// );
/// ```
#[must_use]
pub fn envelope_dedupe_key(scope: &str, key: &str, event_type: EventType) -> String {
    format!("{scope}:{key}:{event_type}")
}
