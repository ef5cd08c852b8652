//! Check-in and visit verification handlers.
//!
//! ```text
//! POST /cafes/{id}/check-in/start
//! POST /reviews/{id}/visit/verify
//! ```

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::USER_AGENT;
use actix_web::{HttpRequest, HttpResponse, post, web};

use crate::domain::checkins::{ClientContext, StartCheckInRequest, VerifyVisitRequest};
use crate::domain::{CafeId, ReviewId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::deadline::within;
use crate::inbound::http::idempotency::{require_idempotency_key, respond};
use crate::inbound::http::identity::Identity;
use crate::inbound::http::schemas::{ErrorSchema, StartCheckInSchema, VerifyVisitSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// User agent and client address as seen behind the proxy.
fn client_context(request: &HttpRequest) -> ClientContext {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let ip = request
        .connection_info()
        .realip_remote_addr()
        .and_then(parse_ip);
    ClientContext { user_agent, ip }
}

/// Start (or resume) a check-in at a café.
#[utoipa::path(
    post,
    path = "/cafes/{id}/check-in/start",
    request_body = StartCheckInSchema,
    params(
        ("id" = String, Path, description = "Café id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Check-in started or resumed"),
        (status = 400, description = "Invalid coordinates", body = ErrorSchema),
        (status = 404, description = "Café not found", body = ErrorSchema),
        (status = 409, description = "Outside the geofence or implausible travel", body = ErrorSchema),
        (status = 429, description = "Another café was checked into too recently", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "startCheckIn"
)]
#[post("/cafes/{id}/check-in/start")]
pub async fn start_check_in(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<StartCheckInRequest>,
) -> ApiResult<HttpResponse> {
    let cafe_id: CafeId = parse_id(&path, FieldName::new("cafe_id"))?;
    let key = require_idempotency_key(request.headers())?;
    let client = client_context(&request);
    let response = within(
        state.deadlines.default,
        "start check-in",
        state
            .check_ins
            .start(identity.actor(), key, cafe_id, payload.into_inner(), client),
    )
    .await?;
    respond(response)
}

/// Attach a completed check-in to a review as visit evidence.
#[utoipa::path(
    post,
    path = "/reviews/{id}/visit/verify",
    request_body = VerifyVisitSchema,
    params(
        ("id" = String, Path, description = "Review id"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Verification recorded"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Review or check-in belongs to another user", body = ErrorSchema),
        (status = 404, description = "Review or check-in not found", body = ErrorSchema),
        (status = 503, description = "Deadline exceeded", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "verifyVisit"
)]
#[post("/reviews/{id}/visit/verify")]
pub async fn verify_visit(
    state: web::Data<HttpState>,
    identity: Identity,
    request: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<VerifyVisitRequest>,
) -> ApiResult<HttpResponse> {
    let review_id: ReviewId = parse_id(&path, FieldName::new("review_id"))?;
    let key = require_idempotency_key(request.headers())?;
    let response = within(
        state.deadlines.verify_visit,
        "verify visit",
        state
            .check_ins
            .verify(identity.actor(), key, review_id, payload.into_inner()),
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
    use crate::domain::idempotency::IdempotentResponse;
    use crate::domain::ports::MockCheckInCommand;
    use crate::inbound::http::idempotency::IDEMPOTENCY_KEY_HEADER;
    use crate::inbound::http::identity::USER_ID_HEADER;
    use crate::inbound::http::test_utils::{CapturedResponse, TestPorts, USER, app_state};
    use crate::inbound::http::validation::json_config;

    const CAFE: &str = "00000000-0000-0000-0000-0000000000c2";

    async fn call(check_ins: MockCheckInCommand, request: test::TestRequest) -> CapturedResponse {
        let state = app_state(TestPorts {
            check_ins,
            ..TestPorts::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(json_config())
                .service(start_check_in)
                .service(verify_visit),
        )
        .await;
        CapturedResponse::capture(test::call_service(&app, request.to_request()).await).await
    }

    #[rstest]
    #[::core::prelude::v1::test]
    #[case("203.0.113.7", Some("203.0.113.7"))]
    #[case("203.0.113.7:52100", Some("203.0.113.7"))]
    #[case("[2001:db8::1]:443", Some("2001:db8::1"))]
    #[case("unknown", None)]
    fn client_addresses_drop_ports(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_ip(raw), expected.map(|ip| ip.parse().expect("valid ip")));
    }

    #[rstest]
    #[actix_web::test]
    async fn start_passes_user_agent_and_forwarded_ip() {
        let mut check_ins = MockCheckInCommand::new();
        check_ins
            .expect_start()
            .withf(|_, _, cafe_id, request, client| {
                cafe_id.to_string() == CAFE
                    && request.lat == 55.75
                    && client.user_agent.as_deref() == Some("kofe-ios/3.1")
                    && client.ip == Some("198.51.100.4".parse().expect("ip"))
            })
            .returning(|_, _, _, _, _| {
                Ok(IdempotentResponse {
                    status: 200,
                    body: json!({ "status": "started" }),
                    replayed: false,
                })
            });

        let response = call(
            check_ins,
            test::TestRequest::post()
                .uri(&format!("/cafes/{CAFE}/check-in/start"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "c1"))
                .insert_header((USER_AGENT, "kofe-ios/3.1"))
                .insert_header(("X-Forwarded-For", "198.51.100.4"))
                .set_json(json!({ "lat": 55.75, "lng": 37.61 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["status"], "started");
    }

    #[rstest]
    #[actix_web::test]
    async fn cooldown_maps_to_429() {
        let mut check_ins = MockCheckInCommand::new();
        check_ins
            .expect_start()
            .returning(|_, _, _, _, _| Err(Error::check_in_cooldown("wait before checking in")));

        let response = call(
            check_ins,
            test::TestRequest::post()
                .uri(&format!("/cafes/{CAFE}/check-in/start"))
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "c2"))
                .set_json(json!({ "lat": 55.75, "lng": 37.61 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.json()["code"], "check_in_cooldown");
    }

    #[rstest]
    #[actix_web::test]
    async fn verify_forwards_the_checkin() {
        let checkin = "00000000-0000-0000-0000-00000000c0de";
        let mut check_ins = MockCheckInCommand::new();
        check_ins
            .expect_verify()
            .withf(move |_, _, _, request| request.checkin_id.to_string() == checkin)
            .returning(|_, _, _, _| {
                Ok(IdempotentResponse {
                    status: 200,
                    body: json!({ "confidence": "high" }),
                    replayed: false,
                })
            });

        let response = call(
            check_ins,
            test::TestRequest::post()
                .uri("/reviews/00000000-0000-0000-0000-0000000000a1/visit/verify")
                .insert_header((USER_ID_HEADER, USER))
                .insert_header((IDEMPOTENCY_KEY_HEADER, "v1"))
                .set_json(json!({ "checkin_id": checkin, "lat": 55.75, "lng": 37.61 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json()["confidence"], "high");
    }
}
