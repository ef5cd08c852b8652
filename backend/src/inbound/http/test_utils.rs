//! Shared helpers for HTTP handler tests.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::http::header::HeaderMap;
use actix_web::test;
use mockable::DefaultClock;
use serde_json::Value;

use super::deadline::Deadlines;
use super::state::{HttpState, HttpStatePorts};
use crate::domain::events::DlqAdmin;
use crate::domain::ports::{
    DisabledSummarizer, MockCheckInCommand, MockEngagementCommand, MockEventStore,
    MockPhotoCommand, MockRatingRepository, MockReputationRepository, MockReviewFeedQuery,
    MockReviewsCommand,
};
use crate::domain::rating::{FormulaSettings, RatingEngine};
use crate::domain::reputation::ReputationLedger;

/// Caller id used by handler tests.
pub(crate) const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Mocks wired into [`app_state`]; unset ports expect no calls.
#[derive(Default)]
pub(crate) struct TestPorts {
    pub reviews: MockReviewsCommand,
    pub check_ins: MockCheckInCommand,
    pub engagement: MockEngagementCommand,
    pub photos: MockPhotoCommand,
    pub feed: MockReviewFeedQuery,
    pub ratings: MockRatingRepository,
    pub reputation: MockReputationRepository,
    pub events: MockEventStore,
}

pub(crate) fn app_state(ports: TestPorts) -> HttpState {
    let clock = Arc::new(DefaultClock);
    let reputation = Arc::new(ports.reputation);
    let ratings = RatingEngine::new(
        Arc::new(ports.ratings),
        reputation.clone(),
        Arc::new(DisabledSummarizer),
        &FormulaSettings::default(),
        clock.clone(),
    );
    HttpState::new(
        HttpStatePorts {
            reviews: Arc::new(ports.reviews),
            check_ins: Arc::new(ports.check_ins),
            engagement: Arc::new(ports.engagement),
            photos: Arc::new(ports.photos),
            feed: Arc::new(ports.feed),
            ratings: Arc::new(ratings),
            reputation: Arc::new(ReputationLedger::new(reputation, clock.clone())),
            dlq: Arc::new(DlqAdmin::new(Arc::new(ports.events), clock)),
        },
        Deadlines::default(),
    )
}

/// Status, headers and decoded body of a handler response.
pub(crate) struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl CapturedResponse {
    pub(crate) async fn capture<B>(response: ServiceResponse<B>) -> Self
    where
        B: MessageBody,
    {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = test::read_body(response).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is JSON")
        };
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub(crate) fn json(&self) -> &Value {
        &self.body
    }
}
