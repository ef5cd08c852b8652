//! PostgreSQL-backed [`RatingRepository`].
//!
//! Snapshot inputs are gathered with one query per aggregate (helpful
//! weights, confirmed reports, visit confidence, author names) keyed by the
//! café's published review ids, then zipped in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{count, count_star, exists, sum};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::checkins::Confidence;
use crate::domain::engagement::AbuseStatus;
use crate::domain::ports::{RatingRepository, StoreError};
use crate::domain::rating::{CafeRatingInputs, RatingSnapshot, ReviewFacts};
use crate::domain::reviews::ReviewStatus;
use crate::domain::{CafeId, ReviewId, UserId};

use super::diesel_helpers::{count_from_db, map_diesel_error, map_pool_error, parse_column};
use super::models::SnapshotRow;
use super::pool::DbPool;
use super::schema::{
    abuse_reports, cafe_rating_snapshots, cafes, helpful_votes, review_attributes, reviews, users,
    visit_verifications,
};

/// Diesel-backed snapshot inputs and storage.
#[derive(Clone)]
pub struct DieselRatingRepository {
    pool: DbPool,
}

impl DieselRatingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

type PublishedReviewRow = (
    Uuid,
    Uuid,
    i16,
    String,
    DateTime<Utc>,
    Option<String>,
    Option<Vec<String>>,
    Option<i32>,
    Option<i32>,
);

async fn load_published(
    conn: &mut AsyncPgConnection,
    cafe_id: &Uuid,
) -> Result<Vec<PublishedReviewRow>, diesel::result::Error> {
    reviews::table
        .left_join(review_attributes::table)
        .filter(reviews::cafe_id.eq(cafe_id))
        .filter(reviews::status.eq(ReviewStatus::Published.as_str()))
        .order_by((reviews::created_at.asc(), reviews::id.asc()))
        .select((
            reviews::id,
            reviews::user_id,
            reviews::rating,
            reviews::summary,
            reviews::created_at,
            review_attributes::drink_name.nullable(),
            review_attributes::taste_tags.nullable(),
            review_attributes::summary_length.nullable(),
            review_attributes::photo_count.nullable(),
        ))
        .load(conn)
        .await
}

async fn helpful_scores(
    conn: &mut AsyncPgConnection,
    review_ids: &[Uuid],
) -> Result<HashMap<Uuid, f64>, diesel::result::Error> {
    let rows: Vec<(Uuid, Option<f64>)> = helpful_votes::table
        .filter(helpful_votes::review_id.eq_any(review_ids))
        .group_by(helpful_votes::review_id)
        .select((helpful_votes::review_id, sum(helpful_votes::weight)))
        .load(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(review_id, total)| (review_id, total.unwrap_or(0.0)))
        .collect())
}

async fn confirmed_reports(
    conn: &mut AsyncPgConnection,
    review_ids: &[Uuid],
) -> Result<HashMap<Uuid, i64>, diesel::result::Error> {
    let rows: Vec<(Uuid, i64)> = abuse_reports::table
        .filter(abuse_reports::review_id.eq_any(review_ids))
        .filter(abuse_reports::status.eq(AbuseStatus::Confirmed.as_str()))
        .group_by(abuse_reports::review_id)
        .select((abuse_reports::review_id, count(abuse_reports::id)))
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn confidences(
    conn: &mut AsyncPgConnection,
    review_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, diesel::result::Error> {
    let rows: Vec<(Uuid, String)> = visit_verifications::table
        .filter(visit_verifications::review_id.eq_any(review_ids))
        .select((visit_verifications::review_id, visit_verifications::confidence))
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn display_names(
    conn: &mut AsyncPgConnection,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, diesel::result::Error> {
    let rows: Vec<(Uuid, String)> = users::table
        .filter(users::id.eq_any(user_ids))
        .select((users::id, users::display_name))
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn global_mean(conn: &mut AsyncPgConnection) -> Result<Option<f64>, diesel::result::Error> {
    let (total, published): (Option<i64>, i64) = reviews::table
        .filter(reviews::status.eq(ReviewStatus::Published.as_str()))
        .select((sum(reviews::rating), count_star()))
        .first(conn)
        .await?;
    Ok(match (total, published) {
        (Some(total), published) if published > 0 => Some(total as f64 / published as f64),
        _ => None,
    })
}

fn to_facts(
    row: PublishedReviewRow,
    helpful: &HashMap<Uuid, f64>,
    reports: &HashMap<Uuid, i64>,
    confidence: &HashMap<Uuid, String>,
    names: &HashMap<Uuid, String>,
) -> Result<ReviewFacts, StoreError> {
    let (id, user_id, rating, summary, created_at, drink_name, tags, summary_length, photo_count) =
        row;
    let rating = u8::try_from(rating)
        .map_err(|_| StoreError::corrupt(format!("reviews.rating out of range: {rating}")))?;
    let summary_length = match summary_length {
        Some(length) => count_from_db(length, "review_attributes.summary_length")?,
        None => u32::try_from(summary.trim().chars().count()).unwrap_or(u32::MAX),
    };
    let photo_count = count_from_db(photo_count.unwrap_or(0), "review_attributes.photo_count")?;
    let confidence = match confidence.get(&id) {
        Some(raw) => parse_column(raw, "visit_verifications.confidence")?,
        None => Confidence::None,
    };
    let confirmed = reports.get(&id).copied().unwrap_or(0);

    Ok(ReviewFacts {
        review_id: ReviewId::from_uuid(id),
        author_id: UserId::from_uuid(user_id),
        author_display_name: names.get(&user_id).cloned(),
        rating,
        summary,
        summary_length,
        drink_name: drink_name.unwrap_or_default(),
        tags_count: tags.map_or(0, |tags| u32::try_from(tags.len()).unwrap_or(u32::MAX)),
        photo_count,
        confidence,
        confirmed_reports: u32::try_from(confirmed).unwrap_or(u32::MAX),
        helpful_score: helpful.get(&id).copied().unwrap_or(0.0),
        created_at,
    })
}

#[async_trait]
impl RatingRepository for DieselRatingRepository {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(exists(cafes::table.find(cafe_id.as_uuid())))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn load_inputs(&self, cafe_id: CafeId) -> Result<CafeRatingInputs, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = load_published(&mut conn, cafe_id.as_uuid())
            .await
            .map_err(map_diesel_error)?;
        let review_ids: Vec<Uuid> = rows.iter().map(|row| row.0).collect();
        let mut author_ids: Vec<Uuid> = rows.iter().map(|row| row.1).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let helpful = helpful_scores(&mut conn, &review_ids)
            .await
            .map_err(map_diesel_error)?;
        let reports = confirmed_reports(&mut conn, &review_ids)
            .await
            .map_err(map_diesel_error)?;
        let confidence = confidences(&mut conn, &review_ids)
            .await
            .map_err(map_diesel_error)?;
        let names = display_names(&mut conn, &author_ids)
            .await
            .map_err(map_diesel_error)?;
        let global_mean = global_mean(&mut conn).await.map_err(map_diesel_error)?;

        let reviews = rows
            .into_iter()
            .map(|row| to_facts(row, &helpful, &reports, &confidence, &names))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CafeRatingInputs {
            reviews,
            global_mean,
        })
    }

    async fn upsert_snapshot(&self, snapshot: &RatingSnapshot) -> Result<(), StoreError> {
        let row = SnapshotRow::from_domain(snapshot)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(cafe_rating_snapshots::table)
            .values(&row)
            .on_conflict(cafe_rating_snapshots::cafe_id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_snapshot(&self, cafe_id: CafeId) -> Result<Option<RatingSnapshot>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<SnapshotRow> = cafe_rating_snapshots::table
            .find(cafe_id.as_uuid())
            .select(SnapshotRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(RatingSnapshot::try_from).transpose()
    }

    async fn list_cafe_ids(&self) -> Result<Vec<CafeId>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = cafes::table
            .order_by(cafes::id.asc())
            .select(cafes::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(CafeId::from_uuid).collect())
    }
}
