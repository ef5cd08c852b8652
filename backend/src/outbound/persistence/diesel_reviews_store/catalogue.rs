//! Café locations and drink catalogue lookups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Text, Timestamptz, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::checkins::GeoPoint;
use crate::domain::drinks::Drink;
use crate::domain::ports::StoreError;
use crate::domain::ports::tx::CatalogueTx;
use crate::domain::{CafeId, DrinkId, UserId};

use super::DieselReviewsTx;
use crate::outbound::persistence::diesel_helpers::map_diesel_error;
use crate::outbound::persistence::models::DrinkRow;
use crate::outbound::persistence::schema::{cafes, drinks};

/// Bumps the mention counter; ignored names return to `new`.
const RECORD_UNKNOWN_DRINK_SQL: &str = "\
INSERT INTO drink_unknown_formats \
    (id, name, mentions_count, first_seen_at, last_seen_at, last_user_id, status) \
VALUES ($1, $2, 1, $3, $3, $4, 'new') \
ON CONFLICT (name) DO UPDATE SET \
    mentions_count = drink_unknown_formats.mentions_count + 1, \
    last_seen_at = EXCLUDED.last_seen_at, \
    last_user_id = EXCLUDED.last_user_id, \
    status = CASE WHEN drink_unknown_formats.status = 'ignored' \
        THEN 'new' ELSE drink_unknown_formats.status END";

#[async_trait]
impl CatalogueTx for DieselReviewsTx<'_> {
    async fn cafe_location(&mut self, cafe_id: CafeId) -> Result<Option<GeoPoint>, StoreError> {
        let location: Option<(f64, f64)> = cafes::table
            .find(cafe_id.as_uuid())
            .select((cafes::lat, cafes::lng))
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(location.map(|(lat, lng)| GeoPoint { lat, lng }))
    }

    async fn find_active_drink(&mut self, drink_id: DrinkId) -> Result<Option<Drink>, StoreError> {
        let row: Option<DrinkRow> = drinks::table
            .find(drink_id.as_uuid())
            .filter(drinks::is_active.eq(true))
            .select(DrinkRow::as_select())
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Drink::from))
    }

    async fn find_active_drink_by_name(
        &mut self,
        canonical: &str,
    ) -> Result<Option<Drink>, StoreError> {
        // The active catalogue is a few hundred rows; matching in Rust keeps
        // whitespace folding identical to `canonicalize_drink_name`.
        let rows: Vec<DrinkRow> = drinks::table
            .filter(drinks::is_active.eq(true))
            .select(DrinkRow::as_select())
            .order_by((drinks::popularity_rank.asc(), drinks::name.asc()))
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(Drink::from)
            .find(|drink| drink.matches_name(canonical)))
    }

    async fn record_unknown_drink(
        &mut self,
        canonical: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sql_query(RECORD_UNKNOWN_DRINK_SQL)
            .bind::<SqlUuid, _>(Uuid::new_v4())
            .bind::<Text, _>(canonical)
            .bind::<Timestamptz, _>(now)
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .execute(self.conn())
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
