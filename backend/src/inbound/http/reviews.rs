//! Review write handlers.
//!
//! ```text
//! POST   /reviews
//! PATCH  /reviews/{id}
//! DELETE /reviews/{id}
//! ```
//!
//! Every write requires an `Idempotency-Key` header and answers with
//! `X-Idempotent-Replay`.

use actix_web::{HttpRequest, HttpResponse, delete, patch, post, web};

use crate::domain::ReviewId;
use crate::domain::reviews::{PublishReviewRequest, RemoveReviewRequest, UpdateReviewRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::idempotency::{require_idempotency_key, respond};
use crate::inbound::http::identity::Identity;
use crate::inbound::http::schemas::{
    ErrorSchema, PublishReviewSchema, RemoveReviewSchema, UpdateReviewSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const REVIEW_ID: FieldName = FieldName::new("review_id");

/// Publish a review, or republish the caller's existing review of the café.
#[utoipa::path(
    post,
    path = "/reviews",
    request_body = PublishReviewSchema,
    params(("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")),
    responses(
        (status = 201, description = "Review created"),
        (status = 200, description = "Existing review republished"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthenticated", body = ErrorSchema),
        (status = 409, description = "Duplicate summary or idempotency conflict", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "publishReview"
)]
#[post("/reviews")]
pub async fn publish_review(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    payload: web::Json<PublishReviewRequest>,
) -> ApiResult<HttpResponse> {
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "publish review",
        state
            .reviews
            .publish(identity.actor(), key, payload.into_inner()),
    )
    .await?;
    respond(response)
}

/// Partially update the caller's own review.
#[utoipa::path(
    patch,
    path = "/reviews/{id}",
    request_body = UpdateReviewSchema,
    params(
        ("id" = String, Path, description = "Review id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Review updated"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "Review not found", body = ErrorSchema),
        (status = 409, description = "Review removed or idempotency conflict", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "updateReview"
)]
#[patch("/reviews/{id}")]
pub async fn update_review(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<UpdateReviewRequest>,
) -> ApiResult<HttpResponse> {
    let review_id: ReviewId = parse_id(&path, REVIEW_ID)?;
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "update review",
        state
            .reviews
            .update(identity.actor(), key, review_id, payload.into_inner()),
    )
    .await?;
    respond(response)
}

/// Soft-remove a review (moderators and admins).
///
/// The body is optional; an empty body removes without a reason.
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    request_body(content = RemoveReviewSchema, description = "Optional removal reason"),
    params(
        ("id" = String, Path, description = "Review id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Review removed"),
        (status = 403, description = "Moderator role required", body = ErrorSchema),
        (status = 404, description = "Review not found", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "removeReview"
)]
#[delete("/reviews/{id}")]
pub async fn remove_review(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
    payload: Option<web::Json<RemoveReviewRequest>>,
) -> ApiResult<HttpResponse> {
    let review_id: ReviewId = parse_id(&path, REVIEW_ID)?;
    let key = require_idempotency_key(request.headers())?;
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let response = within(
        state.deadlines.default,
        "remove review",
        state
            .reviews
            .remove(identity.actor(), key, review_id, body),
    )
    .await?;
    respond(response)
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use mockall::predicate::{always, eq};
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::idempotency::IdempotentResponse;
    use crate::domain::ports::MockReviewsCommand;
    use crate::domain::{Error, Role};
    use crate::inbound::http::idempotency::{IDEMPOTENCY_KEY_HEADER, IDEMPOTENT_REPLAY_HEADER};
    use crate::inbound::http::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, USER, app_state};
    use crate::inbound::http::validation::json_config;

    const CAFE: &str = "00000000-0000-0000-0000-0000000000c1";
    const REVIEW: &str = "00000000-0000-0000-0000-0000000000a1";

    fn publish_body() -> Value {
        json!({
            "cafe_id": CAFE,
            "rating": 5,
            "drink_name": "espresso",
            "summary": "x".repeat(60),
        })
    }

    async fn call(reviews: MockReviewsCommand, request: test::TestRequest) -> CapturedResponse {
        let state = app_state(TestPorts {
            reviews,
            ..TestPorts::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(json_config())
                .service(publish_review)
                .service(update_review)
                .service(remove_review),
        )
        .await;
        CapturedResponse::capture(test::call_service(&app, request.to_request()).await).await
    }

    #[rstest]
    #[actix_web::test]
    async fn publish_forwards_actor_key_and_body() {
        let mut reviews = MockReviewsCommand::new();
        reviews
            .expect_publish()
            .withf(|actor, key, request| {
                actor.user_id.to_string() == USER
                    && key.as_ref() == "k1"
                    && request.rating == 5
                    && request.drink_name.as_deref() == Some("espresso")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(IdempotentResponse {
                    status: 201,
                    body: json!({ "review_id": REVIEW, "event_type": "review.created" }),
                    replayed: false,
                })
            });

        let response = call(
            reviews,
            test::TestRequest::post()
                .uri("/reviews")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k1"))
                .set_json(publish_body()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header(IDEMPOTENT_REPLAY_HEADER), Some("false"));
        assert_eq!(response.json()["event_type"], "review.created");
    }

    #[rstest]
    #[actix_web::test]
    async fn publish_requires_identity_and_key() {
        let anonymous = call(
            MockReviewsCommand::new(),
            test::TestRequest::post()
                .uri("/reviews")
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k1"))
                .set_json(publish_body()),
        )
        .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let keyless = call(
            MockReviewsCommand::new(),
            test::TestRequest::post()
                .uri("/reviews")
                .insert_header((USER_ID_HEADER, USER))
                .set_json(publish_body()),
        )
        .await;
        assert_eq!(keyless.status(), StatusCode::BAD_REQUEST);
        assert_eq!(keyless.json()["code"], "invalid_argument");
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_bodies_are_invalid_argument() {
        let response = call(
            MockReviewsCommand::new(),
            test::TestRequest::post()
                .uri("/reviews")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k1"))
                .set_json(json!({ "cafe_id": "nope", "rating": "five" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["code"], "invalid_argument");
    }

    #[rstest]
    #[actix_web::test]
    async fn idempotency_conflicts_surface_as_409() {
        let mut reviews = MockReviewsCommand::new();
        reviews
            .expect_update()
            .with(always(), always(), eq(REVIEW.parse::<ReviewId>().expect("uuid")), always())
            .returning(|_, _, _, _| Err(Error::idempotency_conflict("payload differs")));

        let response = call(
            reviews,
            test::TestRequest::patch()
                .uri(&format!("/reviews/{REVIEW}"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k2"))
                .set_json(json!({ "rating": 4 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.json()["code"], "idempotency_conflict");
    }

    #[rstest]
    #[actix_web::test]
    async fn removal_accepts_an_empty_body() {
        let mut reviews = MockReviewsCommand::new();
        reviews
            .expect_remove()
            .withf(|actor, _, _, request| actor.role == Role::Moderator && request.reason.is_none())
            .returning(|_, _, _, _| {
                Ok(IdempotentResponse {
                    status: 200,
                    body: json!({ "status": "removed" }),
                    replayed: true,
                })
            });

        let response = call(
            reviews,
            test::TestRequest::delete()
                .uri(&format!("/reviews/{REVIEW}"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((USER_ROLE_HEADER, "moderator"))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k3")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header(IDEMPOTENT_REPLAY_HEADER), Some("true"));
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_review_ids_are_rejected() {
        let response = call(
            MockReviewsCommand::new(),
            test::TestRequest::patch()
                .uri("/reviews/not-a-uuid")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "k4"))
                .set_json(json!({ "rating": 4 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["details"]["field"], "review_id");
    }
}
