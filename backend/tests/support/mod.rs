//! Shared fixtures for the scenario tests.
//!
//! Every scenario runs the real services against `MemoryDatabase` with a
//! clock that only moves when told to, so timings such as dwell, cooldown
//! and retry backoff are exact.

use std::sync::Arc;

use backend::domain::checkins::{CheckInPolicy, CheckInService, GeoPoint};
use backend::domain::engagement::EngagementService;
use backend::domain::events::{
    ConsumerRegistry, DlqAdmin, EventHandler, InboxDispatcher, OutboxDispatcher, RetryPolicy,
};
use backend::domain::idempotency::{IdempotencyKey, IdempotentResponse};
use backend::domain::ports::{DisabledSummarizer, EventStore};
use backend::domain::rate_limit::ReviewRateLimits;
use backend::domain::rating::{FormulaSettings, RatingEngine};
use backend::domain::reviews::{PublishReviewRequest, ReviewWriteResponse, ReviewsService};
use backend::domain::{Actor, CafeId, Error, ErrorCode, ReviewId};
use backend::test_support::{MemoryDatabase, MutableClock};
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use serde::de::DeserializeOwned;

/// Metres per degree of latitude on the sphere used by `GeoPoint`.
const METRES_PER_DEGREE: f64 = 111_194.93;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 6, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint::new(lat, lng).expect("valid coordinates")
}

/// `origin` moved `metres` due north.
pub fn north_of(origin: GeoPoint, metres: f64) -> GeoPoint {
    point(origin.lat + metres / METRES_PER_DEGREE, origin.lng)
}

pub fn key(value: &str) -> IdempotencyKey {
    IdempotencyKey::new(value).expect("valid idempotency key")
}

/// A summary comfortably above the minimum length, varied by `seed`.
pub fn summary(seed: &str) -> String {
    format!(
        "Visited for {seed}: bright acidity, clean finish and a friendly barista who knew the beans."
    )
}

pub fn publish_request(cafe_id: CafeId, rating: i64, seed: &str) -> PublishReviewRequest {
    PublishReviewRequest {
        cafe_id,
        rating,
        drink_id: None,
        drink_name: Some("espresso".to_owned()),
        summary: summary(seed),
        taste_tags: vec!["citrus".to_owned()],
        photos: Vec::new(),
    }
}

pub fn body<T: DeserializeOwned>(response: &IdempotentResponse) -> T {
    serde_json::from_value(response.body.clone()).expect("response body shape")
}

pub fn code<T: std::fmt::Debug>(result: Result<T, Error>) -> ErrorCode {
    result.expect_err("call should fail").code()
}

/// Services wired over one in-memory database.
pub struct World {
    pub db: Arc<MemoryDatabase>,
    pub clock: Arc<MutableClock>,
    pub reviews: ReviewsService<MemoryDatabase>,
    pub check_ins: CheckInService<MemoryDatabase>,
    pub engagement: EngagementService<MemoryDatabase>,
}

impl World {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let clock = Arc::new(MutableClock::new(t0()));
        Self {
            reviews: ReviewsService::new(
                db.clone(),
                Arc::new(ReviewRateLimits::default()),
                clock.clone(),
            ),
            check_ins: CheckInService::new(db.clone(), CheckInPolicy::default(), clock.clone()),
            engagement: EngagementService::new(db.clone(), clock.clone()),
            db,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn events(&self) -> Arc<dyn EventStore> {
        self.db.clone()
    }

    pub async fn cafe_at(&self, location: GeoPoint) -> CafeId {
        let cafe_id = CafeId::random();
        self.db.seed_cafe(cafe_id, location).await;
        cafe_id
    }

    pub fn rating_engine(&self) -> RatingEngine {
        RatingEngine::new(
            self.db.clone(),
            self.db.clone(),
            Arc::new(DisabledSummarizer),
            &FormulaSettings::default(),
            self.clock(),
        )
    }

    pub fn outbox(&self) -> OutboxDispatcher {
        OutboxDispatcher::new(
            self.events(),
            ConsumerRegistry::reviews_core(),
            RetryPolicy::default(),
            self.clock(),
        )
    }

    pub fn inbox(&self, handler: Arc<dyn EventHandler>) -> InboxDispatcher {
        InboxDispatcher::new(self.events(), handler, RetryPolicy::default(), self.clock())
    }

    pub fn dlq(&self) -> DlqAdmin {
        DlqAdmin::new(self.events(), self.clock())
    }

    /// Fan out every pending outbox row.
    pub async fn drain_outbox(&self) -> usize {
        let dispatcher = self.outbox();
        let mut dispatched = 0;
        while dispatcher.dispatch_once().await.expect("dispatch") {
            dispatched += 1;
        }
        dispatched
    }

    /// Publish a review and return its id.
    pub async fn publish(&self, actor: Actor, request: PublishReviewRequest) -> ReviewId {
        let idempotency = format!("publish-{}-{}", actor.user_id, request.cafe_id);
        let response = self
            .reviews
            .publish(actor, key(&idempotency), request)
            .await
            .expect("publish review");
        let written: ReviewWriteResponse = body(&response);
        written.review_id
    }
}
