//! Helpful votes and abuse moderation handlers.
//!
//! ```text
//! POST /reviews/{id}/helpful
//! POST /reviews/{id}/abuse
//! POST /reviews/abuse/{id}/confirm
//! ```

use actix_web::{HttpRequest, HttpResponse, post, web};

use crate::domain::engagement::AbuseReportRequest;
use crate::domain::{ReportId, ReviewId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::idempotency::{require_idempotency_key, respond};
use crate::inbound::http::identity::Identity;
use crate::inbound::http::schemas::{AbuseReportSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const REVIEW_ID: FieldName = FieldName::new("review_id");

/// Vote a review helpful. Repeat votes return the original vote.
#[utoipa::path(
    post,
    path = "/reviews/{id}/helpful",
    params(
        ("id" = String, Path, description = "Review id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 201, description = "Vote recorded"),
        (status = 200, description = "Vote already existed"),
        (status = 403, description = "Voting on one's own review", body = ErrorSchema),
        (status = 404, description = "Review not found", body = ErrorSchema)
    ),
    tags = ["engagement"],
    operation_id = "voteHelpful"
)]
#[post("/reviews/{id}/helpful")]
pub async fn vote_helpful(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let review_id: ReviewId = parse_id(&path, REVIEW_ID)?;
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "vote helpful",
        state
            .engagement
            .vote_helpful(identity.actor(), key, review_id),
    )
    .await?;
    respond(response)
}

/// File an abuse report against a review.
#[utoipa::path(
    post,
    path = "/reviews/{id}/abuse",
    request_body = AbuseReportSchema,
    params(
        ("id" = String, Path, description = "Review id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 201, description = "Report filed"),
        (status = 200, description = "Caller already reported this review"),
        (status = 400, description = "Invalid reason or details", body = ErrorSchema),
        (status = 404, description = "Review not found", body = ErrorSchema)
    ),
    tags = ["engagement"],
    operation_id = "reportAbuse"
)]
#[post("/reviews/{id}/abuse")]
pub async fn report_abuse(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<AbuseReportRequest>,
) -> ApiResult<HttpResponse> {
    let review_id: ReviewId = parse_id(&path, REVIEW_ID)?;
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "report abuse",
        state
            .engagement
            .report_abuse(identity.actor(), key, review_id, payload.into_inner()),
    )
    .await?;
    respond(response)
}

/// Confirm an abuse report (moderators and admins).
#[utoipa::path(
    post,
    path = "/reviews/abuse/{id}/confirm",
    params(
        ("id" = String, Path, description = "Abuse report id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Report confirmed"),
        (status = 403, description = "Moderator role required", body = ErrorSchema),
        (status = 404, description = "Report not found", body = ErrorSchema)
    ),
    tags = ["engagement"],
    operation_id = "confirmAbuse"
)]
#[post("/reviews/abuse/{id}/confirm")]
pub async fn confirm_abuse(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = identity.require_moderator()?;
    let report_id: ReportId = parse_id(&path, FieldName::new("report_id"))?;
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.default,
        "confirm abuse",
        state.engagement.confirm_abuse(actor, key, report_id),
    )
    .await?;
    respond(response)
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::Error;
    use crate::domain::engagement::AbuseReason;
    use crate::domain::idempotency::IdempotentResponse;
    use crate::domain::ports::MockEngagementCommand;
    use crate::inbound::http::idempotency::IDEMPOTENCY_KEY_HEADER;
    use crate::inbound::http::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, USER, app_state};
    use crate::inbound::http::validation::json_config;

    const REVIEW: &str = "00000000-0000-0000-0000-0000000000a1";
    const REPORT: &str = "00000000-0000-0000-0000-0000000000f1";

    async fn call(engagement: MockEngagementCommand, request: test::TestRequest) -> CapturedResponse {
        let state = app_state(TestPorts {
            engagement,
            ..TestPorts::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(json_config())
                .service(vote_helpful)
                .service(report_abuse)
                .service(confirm_abuse),
        )
        .await;
        CapturedResponse::capture(test::call_service(&app, request.to_request()).await).await
    }

    fn ok(status: u16) -> IdempotentResponse {
        IdempotentResponse {
            status,
            body: json!({}),
            replayed: false,
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn self_votes_are_forbidden() {
        let mut engagement = MockEngagementCommand::new();
        engagement
            .expect_vote_helpful()
            .returning(|_, _, _| Err(Error::forbidden("cannot vote on your own review")));

        let response = call(
            engagement,
            test::TestRequest::post()
                .uri(&format!("/reviews/{REVIEW}/helpful"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "h1")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[rstest]
    #[actix_web::test]
    async fn reports_decode_reason_and_details() {
        let mut engagement = MockEngagementCommand::new();
        engagement
            .expect_report_abuse()
            .withf(|_, _, _, request| {
                request.reason == AbuseReason::Spam && request.details.as_deref() == Some("ads")
            })
            .returning(|_, _, _, _| Ok(ok(201)));

        let response = call(
            engagement,
            test::TestRequest::post()
                .uri(&format!("/reviews/{REVIEW}/abuse"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "a1"))
                .set_json(json!({ "reason": "spam", "details": "ads" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[case(None, StatusCode::FORBIDDEN)]
    #[case(Some("barista"), StatusCode::FORBIDDEN)]
    #[case(Some("moderator"), StatusCode::OK)]
    #[case(Some("admin"), StatusCode::OK)]
    #[actix_web::test]
    async fn confirmation_requires_moderation_role(
        #[case] role: Option<&'static str>,
        #[case] expected: StatusCode,
    ) {
        let mut engagement = MockEngagementCommand::new();
        engagement
            .expect_confirm_abuse()
            .returning(|_, _, _| Ok(ok(200)));

        let mut request = test::TestRequest::post()
            .uri(&format!("/reviews/abuse/{REPORT}/confirm"))
            .insert_header((USER_ID_HEADER, USER))
            .insert_header((IDEMPOTENCY_KEY_HEADER, "m1"));
        if let Some(role) = role {
            request = request.insert_header((USER_ROLE_HEADER, role));
        }

        let response = call(engagement, request).await;

        assert_eq!(response.status(), expected);
    }
}
