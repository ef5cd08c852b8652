//! Internal Diesel row structs for the review write path.
//!
//! Rows never leave the persistence layer. Each row converts to and from its
//! domain type; text-encoded enums that fail to parse become
//! `StoreError::Corrupt`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::checkins::{CheckIn, GeoPoint, VisitVerification};
use crate::domain::drinks::Drink;
use crate::domain::engagement::{AbuseReport, HelpfulVote};
use crate::domain::idempotency::{RequestHash, StoredIdempotency};
use crate::domain::ports::StoreError;
use crate::domain::reputation::{NewReputationEvent, ReputationEvent};
use crate::domain::reviews::{Review, ReviewAttributes, StarRating};
use crate::domain::{
    CafeId, CheckInId, DrinkId, ReportId, ReviewId, UserId, VerificationId, VoteId,
};

use super::diesel_helpers::{count_from_db, count_to_db, parse_column, parse_optional_column};
use super::schema::{
    abuse_reports, drinks, helpful_votes, idempotency_keys, reputation_events, review_attributes,
    review_checkins, review_photos, reviews, visit_verifications,
};

mod event_rows;
mod snapshot_rows;

pub(crate) use event_rows::{DlqRow, InboxRow, NewDlqRow, NewInboxRow, NewOutboxRow, OutboxRow};
pub(crate) use snapshot_rows::{PhotoUploadRow, SnapshotRow};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = drinks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DrinkRow {
    pub id: Uuid,
    pub name: String,
    pub aliases: Vec<String>,
    pub popularity_rank: i32,
    pub is_active: bool,
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: DrinkId::from_uuid(row.id),
            name: row.name,
            aliases: row.aliases,
            popularity_rank: row.popularity_rank,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cafe_id: Uuid,
    pub rating: i16,
    pub summary: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            id: *review.id.as_uuid(),
            user_id: *review.user_id.as_uuid(),
            cafe_id: *review.cafe_id.as_uuid(),
            rating: i16::from(review.rating.get()),
            summary: review.summary.clone(),
            status: review.status.as_str().to_owned(),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = StarRating::new(i64::from(row.rating))
            .map_err(|err| StoreError::corrupt(format!("rating: {err}")))?;
        Ok(Self {
            id: ReviewId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            cafe_id: CafeId::from_uuid(row.cafe_id),
            rating,
            summary: row.summary,
            status: parse_column(&row.status, "reviews.status")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = review_attributes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ReviewAttributesRow {
    pub review_id: Uuid,
    pub drink_id: Option<Uuid>,
    pub drink_name: String,
    pub taste_tags: Vec<String>,
    pub summary_length: i32,
    pub summary_fingerprint: String,
    pub photo_count: i32,
}

impl ReviewAttributesRow {
    pub fn from_domain(attributes: &ReviewAttributes) -> Result<Self, StoreError> {
        Ok(Self {
            review_id: *attributes.review_id.as_uuid(),
            drink_id: attributes.drink_id.map(Uuid::from),
            drink_name: attributes.drink_name.clone(),
            taste_tags: attributes.taste_tags.clone(),
            summary_length: count_to_db(attributes.summary_length, "summary_length")?,
            summary_fingerprint: attributes.summary_fingerprint.clone(),
            photo_count: count_to_db(attributes.photo_count, "photo_count")?,
        })
    }
}

impl TryFrom<ReviewAttributesRow> for ReviewAttributes {
    type Error = StoreError;

    fn try_from(row: ReviewAttributesRow) -> Result<Self, Self::Error> {
        Ok(Self {
            review_id: ReviewId::from_uuid(row.review_id),
            drink_id: row.drink_id.map(DrinkId::from_uuid),
            drink_name: row.drink_name,
            taste_tags: row.taste_tags,
            summary_length: count_from_db(row.summary_length, "summary_length")?,
            summary_fingerprint: row.summary_fingerprint,
            photo_count: count_from_db(row.photo_count, "photo_count")?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = review_photos)]
pub(crate) struct NewReviewPhotoRow<'a> {
    pub review_id: Uuid,
    pub position: i32,
    pub photo_url: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = review_checkins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CheckInRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cafe_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub start_distance_m: f64,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_review_id: Option<Uuid>,
    pub verify_lat: Option<f64>,
    pub verify_lng: Option<f64>,
    pub verify_distance_m: Option<f64>,
    pub dwell_seconds: Option<i64>,
    pub confidence: Option<String>,
    pub risk_flags: Vec<String>,
    pub user_agent_hash: Option<String>,
    pub ip_prefix: Option<String>,
}

impl From<&CheckIn> for CheckInRow {
    fn from(checkin: &CheckIn) -> Self {
        Self {
            id: *checkin.id.as_uuid(),
            user_id: *checkin.user_id.as_uuid(),
            cafe_id: *checkin.cafe_id.as_uuid(),
            status: checkin.status.as_str().to_owned(),
            started_at: checkin.started_at,
            start_lat: checkin.start.lat,
            start_lng: checkin.start.lng,
            start_distance_m: checkin.start_distance_m,
            verified_at: checkin.verified_at,
            verified_review_id: checkin.verified_review_id.map(Uuid::from),
            verify_lat: checkin.verify_point.map(|point| point.lat),
            verify_lng: checkin.verify_point.map(|point| point.lng),
            verify_distance_m: checkin.verify_distance_m,
            dwell_seconds: checkin.dwell_seconds,
            confidence: checkin.confidence.map(|c| c.as_str().to_owned()),
            risk_flags: checkin.risk_flags.clone(),
            user_agent_hash: checkin.user_agent_hash.clone(),
            ip_prefix: checkin.ip_prefix.clone(),
        }
    }
}

impl TryFrom<CheckInRow> for CheckIn {
    type Error = StoreError;

    fn try_from(row: CheckInRow) -> Result<Self, Self::Error> {
        let verify_point = match (row.verify_lat, row.verify_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };
        Ok(Self {
            id: CheckInId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            cafe_id: CafeId::from_uuid(row.cafe_id),
            status: parse_column(&row.status, "review_checkins.status")?,
            started_at: row.started_at,
            start: GeoPoint {
                lat: row.start_lat,
                lng: row.start_lng,
            },
            start_distance_m: row.start_distance_m,
            verified_at: row.verified_at,
            verified_review_id: row.verified_review_id.map(ReviewId::from_uuid),
            verify_point,
            verify_distance_m: row.verify_distance_m,
            dwell_seconds: row.dwell_seconds,
            confidence: parse_optional_column(
                row.confidence.as_deref(),
                "review_checkins.confidence",
            )?,
            risk_flags: row.risk_flags,
            user_agent_hash: row.user_agent_hash,
            ip_prefix: row.ip_prefix,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = visit_verifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct VisitVerificationRow {
    pub id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub cafe_id: Uuid,
    pub confidence: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub dwell_seconds: i64,
}

impl From<&VisitVerification> for VisitVerificationRow {
    fn from(verification: &VisitVerification) -> Self {
        Self {
            id: *verification.id.as_uuid(),
            review_id: *verification.review_id.as_uuid(),
            user_id: *verification.user_id.as_uuid(),
            cafe_id: *verification.cafe_id.as_uuid(),
            confidence: verification.confidence.as_str().to_owned(),
            verified_at: verification.verified_at,
            dwell_seconds: verification.dwell_seconds,
        }
    }
}

impl TryFrom<VisitVerificationRow> for VisitVerification {
    type Error = StoreError;

    fn try_from(row: VisitVerificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: VerificationId::from_uuid(row.id),
            review_id: ReviewId::from_uuid(row.review_id),
            user_id: UserId::from_uuid(row.user_id),
            cafe_id: CafeId::from_uuid(row.cafe_id),
            confidence: parse_column(&row.confidence, "visit_verifications.confidence")?,
            verified_at: row.verified_at,
            dwell_seconds: row.dwell_seconds,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = helpful_votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HelpfulVoteRow {
    pub id: Uuid,
    pub review_id: Uuid,
    pub voter_user_id: Uuid,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&HelpfulVote> for HelpfulVoteRow {
    fn from(vote: &HelpfulVote) -> Self {
        Self {
            id: *vote.id.as_uuid(),
            review_id: *vote.review_id.as_uuid(),
            voter_user_id: *vote.voter_user_id.as_uuid(),
            weight: vote.weight,
            created_at: vote.created_at,
        }
    }
}

impl From<HelpfulVoteRow> for HelpfulVote {
    fn from(row: HelpfulVoteRow) -> Self {
        Self {
            id: VoteId::from_uuid(row.id),
            review_id: ReviewId::from_uuid(row.review_id),
            voter_user_id: UserId::from_uuid(row.voter_user_id),
            weight: row.weight,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = abuse_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AbuseReportRow {
    pub id: Uuid,
    pub review_id: Uuid,
    pub reporter_user_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    pub status: String,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&AbuseReport> for AbuseReportRow {
    fn from(report: &AbuseReport) -> Self {
        Self {
            id: *report.id.as_uuid(),
            review_id: *report.review_id.as_uuid(),
            reporter_user_id: *report.reporter_user_id.as_uuid(),
            reason: report.reason.as_str().to_owned(),
            details: report.details.clone(),
            status: report.status.as_str().to_owned(),
            confirmed_by: report.confirmed_by.map(Uuid::from),
            confirmed_at: report.confirmed_at,
            created_at: report.created_at,
        }
    }
}

impl TryFrom<AbuseReportRow> for AbuseReport {
    type Error = StoreError;

    fn try_from(row: AbuseReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReportId::from_uuid(row.id),
            review_id: ReviewId::from_uuid(row.review_id),
            reporter_user_id: UserId::from_uuid(row.reporter_user_id),
            reason: parse_column(&row.reason, "abuse_reports.reason")?,
            details: row.details,
            status: parse_column(&row.status, "abuse_reports.status")?,
            confirmed_by: row.confirmed_by.map(UserId::from_uuid),
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = idempotency_keys)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdempotencyRow {
    pub request_hash: String,
    pub response_status: i32,
    pub response_body: Value,
}

impl TryFrom<IdempotencyRow> for StoredIdempotency {
    type Error = StoreError;

    fn try_from(row: IdempotencyRow) -> Result<Self, Self::Error> {
        let request_hash = RequestHash::from_hex(&row.request_hash)
            .map_err(|err| StoreError::corrupt(format!("idempotency_keys.request_hash: {err}")))?;
        Ok(Self {
            request_hash,
            response_status: row.response_status,
            response_body: row.response_body,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_keys)]
pub(crate) struct NewIdempotencyRow<'a> {
    pub scope: &'a str,
    pub key: &'a str,
    pub request_hash: String,
    pub response_status: i32,
    pub response_body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reputation_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReputationEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: String,
    pub source_type: String,
    pub source_id: Uuid,
    pub points: i32,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReputationEventRow> for ReputationEvent {
    type Error = StoreError;

    fn try_from(row: ReputationEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            event_type: parse_column(&row.event_type, "reputation_events.event_type")?,
            source_type: row.source_type,
            source_id: row.source_id,
            points: row.points,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reputation_events)]
pub(crate) struct NewReputationEventRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: &'static str,
    pub source_type: &'static str,
    pub source_id: Uuid,
    pub points: i32,
    pub metadata: &'a Value,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a NewReputationEvent> for NewReputationEventRow<'a> {
    fn from(event: &'a NewReputationEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: *event.user_id.as_uuid(),
            event_type: event.event_type.as_str(),
            source_type: event.event_type.source_type(),
            source_id: event.source_id,
            points: event.points,
            metadata: &event.metadata,
            created_at: event.created_at,
        }
    }
}

/// Collect fallible row conversions.
pub(crate) fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
