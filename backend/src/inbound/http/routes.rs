//! Route table for the REST surface.
//!
//! Every handler is mounted at the root; the deployment proxy owns any
//! versioned prefix. Extractor error handlers are registered here so malformed
//! bodies and query strings surface as `invalid_argument`.

use actix_web::web;

use super::admin::{ai_health, list_dlq, recompute_rating, replay_dlq, versioning};
use super::cafes::{cafe_rating, list_cafe_reviews, user_reputation};
use super::checkins::{start_check_in, verify_visit};
use super::engagement::{confirm_abuse, report_abuse, vote_helpful};
use super::health::{live, ready};
use super::photos::{confirm_photo, photo_status, presign_photo};
use super::reviews::{publish_review, remove_review, update_review};
use super::validation::{json_config, query_config};

/// Register every endpoint and extractor config on `cfg`.
///
/// Literal segments such as `/reviews/photos/...` and `/reviews/abuse/...`
/// are registered before `/reviews/{id}` patterns.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(ready)
        .service(live)
        .service(presign_photo)
        .service(confirm_photo)
        .service(photo_status)
        .service(confirm_abuse)
        .service(publish_review)
        .service(update_review)
        .service(remove_review)
        .service(vote_helpful)
        .service(report_abuse)
        .service(verify_visit)
        .service(start_check_in)
        .service(list_cafe_reviews)
        .service(cafe_rating)
        .service(user_reputation)
        .service(list_dlq)
        .service(replay_dlq)
        .service(recompute_rating)
        .service(ai_health)
        .service(versioning);
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::idempotency::IdempotentResponse;
    use crate::inbound::http::health::HealthState;
    use crate::inbound::http::idempotency::IDEMPOTENCY_KEY_HEADER;
    use crate::inbound::http::identity::USER_ID_HEADER;
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, USER, app_state};

    async fn call(ports: TestPorts, request: test::TestRequest) -> CapturedResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(ports)))
                .app_data(web::Data::new(HealthState::new()))
                .configure(configure),
        )
        .await;
        CapturedResponse::capture(test::call_service(&app, request.to_request()).await).await
    }

    #[rstest]
    #[actix_web::test]
    async fn photo_confirm_is_not_shadowed_by_review_ids() {
        let mut ports = TestPorts::default();
        ports.photos.expect_confirm().returning(|_, _, _| {
            Ok(IdempotentResponse {
                status: 202,
                body: json!({ "status": "pending" }),
                replayed: false,
            })
        });

        let response = call(
            ports,
            test::TestRequest::post()
                .uri("/reviews/photos/confirm")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "r1"))
                .set_json(json!({ "object_key": "reviews/users/u/tmp/a.jpg" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_json_is_invalid_argument() {
        let response = call(
            TestPorts::default(),
            test::TestRequest::post()
                .uri("/reviews")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "r2"))
                .insert_header(("Content-Type", "application/json"))
                .set_payload("{"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["code"], "invalid_argument");
    }

    #[rstest]
    #[actix_web::test]
    async fn liveness_probe_is_mounted() {
        let response = call(
            TestPorts::default(),
            test::TestRequest::get().uri("/health/live"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
