//! Cafés and the drinks catalogue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::checkins::GeoPoint;
use crate::domain::drinks::Drink;
use crate::domain::ports::StoreError;
use crate::domain::{CafeId, DrinkId, UserId};

#[async_trait]
pub trait CatalogueTx: Send {
    /// Coordinates of a café; `None` when the café does not exist.
    async fn cafe_location(&mut self, cafe_id: CafeId) -> Result<Option<GeoPoint>, StoreError>;

    async fn find_active_drink(&mut self, drink_id: DrinkId) -> Result<Option<Drink>, StoreError>;

    /// Active drink whose canonical name or alias equals `canonical`.
    async fn find_active_drink_by_name(
        &mut self,
        canonical: &str,
    ) -> Result<Option<Drink>, StoreError>;

    /// Upsert an unknown drink mention.
    async fn record_unknown_drink(
        &mut self,
        canonical: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
