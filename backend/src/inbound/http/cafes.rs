//! Café read handlers.
//!
//! ```text
//! GET /cafes/{id}/reviews?sort=new|helpful|verified&limit=20&cursor=...
//! GET /cafes/{id}/rating
//! GET /users/{id}/reputation
//! ```

use actix_web::{HttpResponse, get, web};
use pagination::{PageParams, PaginationError};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::reviews::ReviewSort;
use crate::domain::{CafeId, Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const CAFE_ID: FieldName = FieldName::new("cafe_id");

fn pagination_error(err: PaginationError) -> Error {
    let field = match err {
        PaginationError::InvalidLimit => "limit",
        PaginationError::Cursor(_) => "cursor",
    };
    Error::invalid_argument(err.to_string()).with_details(json!({ "field": field }))
}

/// Query string of the review feed.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewFeedParams {
    /// `new` (default), `helpful` or `verified`.
    pub sort: Option<String>,
    /// Page size, 1 to 50, default 20.
    pub limit: Option<u32>,
    /// Opaque cursor from a previous page's `next_cursor`.
    pub cursor: Option<String>,
}

/// One page of a café's published reviews.
#[utoipa::path(
    get,
    path = "/cafes/{id}/reviews",
    params(("id" = String, Path, description = "Café id"), ReviewFeedParams),
    responses(
        (status = 200, description = "`{ data, limit, next_cursor? }`"),
        (status = 400, description = "Invalid sort, limit or cursor", body = ErrorSchema),
        (status = 404, description = "Café not found", body = ErrorSchema)
    ),
    tags = ["cafes"],
    operation_id = "listCafeReviews"
)]
#[get("/cafes/{id}/reviews")]
pub async fn list_cafe_reviews(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<ReviewFeedParams>,
) -> ApiResult<HttpResponse> {
    let cafe_id: CafeId = parse_id(&path, CAFE_ID)?;
    let ReviewFeedParams {
        sort,
        limit,
        cursor,
    } = query.into_inner();
    let sort = sort.as_deref().unwrap_or_default().parse::<ReviewSort>()?;
    let params = PageParams::resolve(limit, cursor.as_deref()).map_err(pagination_error)?;
    let page = within(
        state.deadlines.default,
        "list reviews",
        state.feed.list(cafe_id, sort, params),
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Current rating snapshot of a café.
#[utoipa::path(
    get,
    path = "/cafes/{id}/rating",
    params(("id" = String, Path, description = "Café id")),
    responses(
        (status = 200, description = "Rating snapshot"),
        (status = 404, description = "Café not found", body = ErrorSchema)
    ),
    tags = ["cafes"],
    operation_id = "cafeRating"
)]
#[get("/cafes/{id}/rating")]
pub async fn cafe_rating(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let cafe_id: CafeId = parse_id(&path, CAFE_ID)?;
    let snapshot = within(
        state.deadlines.default,
        "read rating",
        state.ratings.snapshot(cafe_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Reputation score and badge of a user.
#[utoipa::path(
    get,
    path = "/users/{id}/reputation",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Score, tier and badge"),
        (status = 400, description = "Invalid user id", body = ErrorSchema)
    ),
    tags = ["reputation"],
    operation_id = "userReputation"
)]
#[get("/users/{id}/reputation")]
pub async fn user_reputation(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id: UserId = parse_id(&path, FieldName::new("user_id"))?;
    let summary = within(
        state.deadlines.default,
        "read reputation",
        state.reputation.summary(user_id),
    )
    .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use mockall::predicate::eq;
    use pagination::Paginated;
    use rstest::rstest;

    use super::*;
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, app_state};
    use crate::inbound::http::validation::query_config;

    const CAFE: &str = "00000000-0000-0000-0000-0000000000c1";

    async fn call(ports: TestPorts, uri: &str) -> CapturedResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(ports)))
                .app_data(query_config())
                .service(list_cafe_reviews)
                .service(cafe_rating)
                .service(user_reputation),
        )
        .await;
        let request = test::TestRequest::get().uri(uri).to_request();
        CapturedResponse::capture(test::call_service(&app, request).await).await
    }

    #[rstest]
    #[case("", ReviewSort::New)]
    #[case("?sort=helpful", ReviewSort::Helpful)]
    #[case("?sort=verified&limit=5", ReviewSort::Verified)]
    #[actix_web::test]
    async fn feed_forwards_sort_and_page(#[case] query: &str, #[case] sort: ReviewSort) {
        let mut ports = TestPorts::default();
        ports
            .feed
            .expect_list()
            .with(
                eq(CAFE.parse::<CafeId>().expect("uuid")),
                eq(sort),
                mockall::predicate::always(),
            )
            .returning(|_, _, params| Ok(Paginated::from_rows(Vec::new(), params)));

        let response = call(ports, &format!("/cafes/{CAFE}/reviews{query}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.json()["data"].as_array().is_some_and(Vec::is_empty));
        assert!(response.json().get("next_cursor").is_none());
    }

    #[rstest]
    #[case("?sort=oldest")]
    #[case("?limit=0")]
    #[case("?cursor=%%%")]
    #[actix_web::test]
    async fn invalid_feed_queries_are_rejected(#[case] query: &str) {
        let response = call(TestPorts::default(), &format!("/cafes/{CAFE}/reviews{query}")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["code"], "invalid_argument");
    }

    #[rstest]
    #[actix_web::test]
    async fn rating_of_unknown_cafe_is_404() {
        let mut ports = TestPorts::default();
        ports.ratings.expect_cafe_exists().returning(|_| Ok(false));

        let response = call(ports, &format!("/cafes/{CAFE}/rating")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn reputation_of_a_new_user_is_zero() {
        let mut ports = TestPorts::default();
        ports
            .reputation
            .expect_events_for_user()
            .returning(|_| Ok(Vec::new()));

        let response = call(ports, "/users/3fa85f64-5717-4562-b3fc-2c963f66afa6/reputation").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["score"], 0.0);
        assert_eq!(response.json()["events_count"], 0);
    }
}
