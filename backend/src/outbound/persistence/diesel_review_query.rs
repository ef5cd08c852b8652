//! PostgreSQL-backed [`ReviewQuery`] for the public review feed.
//!
//! Helpful totals and ordered photo URLs are aggregated per row with lateral
//! joins so the helpful sort can order by them directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Array, BigInt, Double, Nullable, SmallInt, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::checkins::Confidence;
use crate::domain::ports::{ReviewQuery, StoreError};
use crate::domain::reviews::{ReviewListItem, ReviewSort};
use crate::domain::{CafeId, DrinkId, ReviewId, UserId};

use super::diesel_helpers::{map_diesel_error, map_pool_error, parse_column};
use super::pool::DbPool;
use super::schema::cafes;

/// Diesel-backed review feed.
#[derive(Clone)]
pub struct DieselReviewQuery {
    pool: DbPool,
}

impl DieselReviewQuery {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const LISTING_SQL: &str = r#"
SELECT r.id,
       r.user_id,
       u.display_name AS author_display_name,
       r.rating,
       r.summary,
       a.drink_id,
       COALESCE(a.drink_name, '') AS drink_name,
       COALESCE(a.taste_tags, '{}'::text[]) AS taste_tags,
       COALESCE(p.photos, '{}'::text[]) AS photos,
       COALESCE(h.helpful_score, 0)::float8 AS helpful_score,
       COALESCE(h.helpful_count, 0) AS helpful_count,
       COALESCE(v.confidence, 'none') AS visit_confidence,
       r.created_at,
       r.updated_at
FROM reviews r
LEFT JOIN users u ON u.id = r.user_id
LEFT JOIN review_attributes a ON a.review_id = r.id
LEFT JOIN visit_verifications v ON v.review_id = r.id
LEFT JOIN LATERAL (
    SELECT array_agg(rp.photo_url ORDER BY rp.position) AS photos
    FROM review_photos rp
    WHERE rp.review_id = r.id
) p ON TRUE
LEFT JOIN LATERAL (
    SELECT SUM(hv.weight) AS helpful_score, COUNT(*) AS helpful_count
    FROM helpful_votes hv
    WHERE hv.review_id = r.id
) h ON TRUE
WHERE r.cafe_id = $1 AND r.status = 'published'
"#;

const CONFIDENCE_RANK_SQL: &str = "CASE COALESCE(v.confidence, 'none') \
    WHEN 'high' THEN 3 WHEN 'medium' THEN 2 WHEN 'low' THEN 1 ELSE 0 END";

fn order_clause(sort: ReviewSort) -> String {
    match sort {
        ReviewSort::New => "r.created_at DESC, r.id DESC".to_owned(),
        ReviewSort::Helpful => {
            "COALESCE(h.helpful_score, 0) DESC, r.created_at DESC, r.id DESC".to_owned()
        }
        ReviewSort::Verified => {
            format!("{CONFIDENCE_RANK_SQL} DESC, r.created_at DESC, r.id DESC")
        }
    }
}

#[derive(Debug, QueryableByName)]
struct ListingRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    user_id: Uuid,
    #[diesel(sql_type = Nullable<Text>)]
    author_display_name: Option<String>,
    #[diesel(sql_type = SmallInt)]
    rating: i16,
    #[diesel(sql_type = Text)]
    summary: String,
    #[diesel(sql_type = Nullable<diesel::sql_types::Uuid>)]
    drink_id: Option<Uuid>,
    #[diesel(sql_type = Text)]
    drink_name: String,
    #[diesel(sql_type = Array<Text>)]
    taste_tags: Vec<String>,
    #[diesel(sql_type = Array<Text>)]
    photos: Vec<String>,
    #[diesel(sql_type = Double)]
    helpful_score: f64,
    #[diesel(sql_type = BigInt)]
    helpful_count: i64,
    #[diesel(sql_type = Text)]
    visit_confidence: String,
    #[diesel(sql_type = Timestamptz)]
    created_at: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for ReviewListItem {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| StoreError::corrupt(format!("reviews.rating out of range: {}", row.rating)))?;
        let visit_confidence: Confidence =
            parse_column(&row.visit_confidence, "visit_verifications.confidence")?;
        Ok(Self {
            id: ReviewId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            author_display_name: row.author_display_name,
            rating,
            summary: row.summary,
            drink_id: row.drink_id.map(DrinkId::from_uuid),
            drink_name: row.drink_name,
            taste_tags: row.taste_tags,
            photos: row.photos,
            helpful_score: row.helpful_score,
            helpful_count: u32::try_from(row.helpful_count).unwrap_or(u32::MAX),
            visit_confidence,
            visit_verified: visit_confidence.is_verified(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReviewQuery for DieselReviewQuery {
    async fn cafe_exists(&self, cafe_id: CafeId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(exists(cafes::table.find(cafe_id.as_uuid())))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn list_cafe_reviews(
        &self,
        cafe_id: CafeId,
        sort: ReviewSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<ReviewListItem>, StoreError> {
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::query("listing offset out of range"))?;
        let statement = format!(
            "{LISTING_SQL} ORDER BY {} OFFSET $2 LIMIT $3",
            order_clause(sort)
        );
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ListingRow> = sql_query(statement)
            .bind::<diesel::sql_types::Uuid, _>(cafe_id.as_uuid())
            .bind::<BigInt, _>(offset)
            .bind::<BigInt, _>(i64::from(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(ReviewListItem::try_from).collect()
    }
}
