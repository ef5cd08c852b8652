//! Operator endpoints for moderators and admins.
//!
//! ```text
//! GET  /admin/events/dlq?include_resolved=false&limit=50&offset=0
//! POST /admin/events/dlq/{id}/replay
//! POST /admin/cafes/{id}/rating/recompute
//! GET  /admin/reviews/ai/health
//! GET  /admin/reviews/versioning
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use crate::domain::{CafeId, DlqId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::identity::Identity;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Query string of the DLQ listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DlqListParams {
    /// Include rows that were already replayed.
    #[serde(default)]
    pub include_resolved: bool,
    /// Page size, clamped to 1..=500, default 50.
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/admin/events/dlq",
    params(DlqListParams),
    responses(
        (status = 200, description = "Dead-lettered inbox rows, newest first"),
        (status = 401, description = "Missing identity", body = ErrorSchema),
        (status = 403, description = "Moderator role required", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "listDlq"
)]
#[get("/admin/events/dlq")]
pub async fn list_dlq(
    state: web::Data<HttpState>,
    identity: Identity,
    query: web::Query<DlqListParams>,
) -> ApiResult<HttpResponse> {
    identity.require_moderator()?;
    let DlqListParams {
        include_resolved,
        limit,
        offset,
    } = query.into_inner();
    let entries = within(
        state.deadlines.default,
        "list dlq",
        state.dlq.list(include_resolved, limit, offset),
    )
    .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Re-arm the inbox row behind a DLQ entry.
#[utoipa::path(
    post,
    path = "/admin/events/dlq/{id}/replay",
    params(("id" = String, Path, description = "DLQ entry id")),
    responses(
        (status = 200, description = "Inbox row reset or recreated"),
        (status = 403, description = "Moderator role required", body = ErrorSchema),
        (status = 404, description = "DLQ entry not found", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "replayDlq"
)]
#[post("/admin/events/dlq/{id}/replay")]
pub async fn replay_dlq(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = identity.require_moderator()?;
    let dlq_id: DlqId = parse_id(&path, FieldName::new("dlq_id"))?;
    let outcome = within(state.deadlines.default, "replay dlq", state.dlq.replay(dlq_id)).await?;
    info!(%dlq_id, operator = %actor.user_id, "dlq replay requested");
    Ok(HttpResponse::Ok().json(outcome))
}

/// Recompute a café's snapshot now, descriptive tags included.
#[utoipa::path(
    post,
    path = "/admin/cafes/{id}/rating/recompute",
    params(("id" = String, Path, description = "Café id")),
    responses(
        (status = 200, description = "Fresh rating snapshot"),
        (status = 403, description = "Moderator role required", body = ErrorSchema),
        (status = 404, description = "Café not found", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "recomputeRating"
)]
#[post("/admin/cafes/{id}/rating/recompute")]
pub async fn recompute_rating(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    identity.require_moderator()?;
    let cafe_id: CafeId = parse_id(&path, FieldName::new("cafe_id"))?;
    let snapshot = within(
        state.deadlines.default,
        "recompute rating",
        state.ratings.force_recompute(cafe_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[utoipa::path(
    get,
    path = "/admin/reviews/ai/health",
    responses(
        (status = 200, description = "Summariser state"),
        (status = 403, description = "Moderator role required", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "reviewsAiHealth"
)]
#[get("/admin/reviews/ai/health")]
pub async fn ai_health(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<HttpResponse> {
    identity.require_moderator()?;
    Ok(HttpResponse::Ok().json(state.ratings.ai_health()))
}

#[utoipa::path(
    get,
    path = "/admin/reviews/versioning",
    responses(
        (status = 200, description = "Requested and applied formula versions"),
        (status = 403, description = "Moderator role required", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "reviewsVersioning"
)]
#[get("/admin/reviews/versioning")]
pub async fn versioning(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<HttpResponse> {
    identity.require_moderator()?;
    Ok(HttpResponse::Ok().json(state.ratings.versioning_status()))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;

    use super::*;
    use crate::domain::InboxId;
    use crate::domain::events::{ReplayMode, ReplayOutcome};
    use crate::inbound::http::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, USER, app_state};
    use crate::inbound::http::validation::query_config;

    const DLQ: &str = "00000000-0000-0000-0000-0000000000d1";

    async fn call(ports: TestPorts, request: test::TestRequest) -> CapturedResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(ports)))
                .app_data(query_config())
                .service(list_dlq)
                .service(replay_dlq)
                .service(recompute_rating)
                .service(ai_health)
                .service(versioning),
        )
        .await;
        CapturedResponse::capture(test::call_service(&app, request.to_request()).await).await
    }

    fn as_role(request: test::TestRequest, role: &str) -> test::TestRequest {
        request
            .insert_header((USER_ID_HEADER, USER))
            .insert_header((USER_ROLE_HEADER, role))
    }

    #[rstest]
    #[case("/admin/events/dlq")]
    #[case("/admin/reviews/ai/health")]
    #[case("/admin/reviews/versioning")]
    #[actix_web::test]
    async fn regular_users_are_turned_away(#[case] uri: &str) {
        let response = call(
            TestPorts::default(),
            as_role(test::TestRequest::get().uri(uri), "user"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.json()["code"], "forbidden");
    }

    #[rstest]
    #[actix_web::test]
    async fn listing_forwards_filters_to_the_store() {
        let mut ports = TestPorts::default();
        ports
            .events
            .expect_list_dlq()
            .withf(|query| query.include_resolved && query.limit == 10 && query.offset == 20)
            .returning(|_| Ok(Vec::new()));

        let response = call(
            ports,
            as_role(
                test::TestRequest::get()
                    .uri("/admin/events/dlq?include_resolved=true&limit=10&offset=20"),
                "moderator",
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.json().as_array().is_some_and(Vec::is_empty));
    }

    #[rstest]
    #[actix_web::test]
    async fn replay_reports_the_mode() {
        let mut ports = TestPorts::default();
        ports.events.expect_replay_dlq().returning(|dlq_id, now| {
            Ok(Some(ReplayOutcome {
                dlq_id,
                inbox_id: InboxId::random(),
                mode: ReplayMode::RecreatedInbox,
                resolved_at: now,
            }))
        });

        let response = call(
            ports,
            as_role(
                test::TestRequest::post().uri(&format!("/admin/events/dlq/{DLQ}/replay")),
                "admin",
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["mode"], "recreated_inbox");
        assert_eq!(response.json()["dlq_id"], DLQ);
    }

    #[rstest]
    #[actix_web::test]
    async fn replay_of_unknown_entry_is_404() {
        let mut ports = TestPorts::default();
        ports.events.expect_replay_dlq().returning(|_, _| Ok(None));

        let response = call(
            ports,
            as_role(
                test::TestRequest::post().uri(&format!("/admin/events/dlq/{DLQ}/replay")),
                "moderator",
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn ai_health_reports_disabled_summariser() {
        let response = call(
            TestPorts::default(),
            as_role(test::TestRequest::get().uri("/admin/reviews/ai/health"), "admin"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["enabled"], false);
        assert_eq!(response.json()["min_reviews"], 3);
    }

    #[rstest]
    #[actix_web::test]
    async fn versioning_shows_applied_formulas() {
        let response = call(
            TestPorts::default(),
            as_role(test::TestRequest::get().uri("/admin/reviews/versioning"), "moderator"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["rating_version"], "rating_v2");
        assert_eq!(response.json()["quality_version"], "quality_v1");
    }
}
