//! Caller identity forwarded by the identity provider.
//!
//! The gateway authenticates users and forwards `X-User-Id` (UUID) plus an
//! optional `X-User-Role`. Handlers take [`Identity`] as an extractor and get
//! an [`Actor`] or a `401`.

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{Ready, ready};
use serde_json::json;
use tracing::warn;

use crate::domain::{Actor, Error, Role, UserId};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the platform role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(Actor);

impl Identity {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0
    }

    /// Fail with `forbidden` unless the caller is a moderator or admin.
    pub fn require_moderator(&self) -> Result<Actor, Error> {
        if self.0.can_moderate() {
            Ok(self.0)
        } else {
            Err(Error::forbidden("moderator or admin role required"))
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, Error> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| Error::unauthorized(format!("{name} header must be ASCII")))
        })
        .transpose()
}

/// Read the caller's [`Actor`] from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Error> {
    let raw_id = header_str(headers, USER_ID_HEADER)?
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::unauthorized("authentication required"))?;
    let user_id = raw_id.parse::<UserId>().map_err(|err| {
        warn!(error = %err, "rejected malformed user id header");
        Error::unauthorized("authentication required")
    })?;
    let role = match header_str(headers, USER_ROLE_HEADER)? {
        Some(raw) => raw.parse::<Role>().map_err(|err| {
            Error::forbidden(err.to_string()).with_details(json!({ "header": USER_ROLE_HEADER }))
        })?,
        None => Role::User,
    };
    Ok(Actor::new(user_id, role))
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req.headers()).map(Identity))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut request = test::TestRequest::default();
        for (name, value) in pairs {
            request = request.insert_header((*name, *value));
        }
        request.to_http_request().headers().clone()
    }

    #[rstest]
    #[::core::prelude::v1::test]
    #[case(&[(USER_ID_HEADER, USER)], Role::User)]
    #[case(&[(USER_ID_HEADER, USER), (USER_ROLE_HEADER, "moderator")], Role::Moderator)]
    #[case(&[(USER_ID_HEADER, USER), (USER_ROLE_HEADER, "ADMIN")], Role::Admin)]
    #[case(&[(USER_ID_HEADER, USER), (USER_ROLE_HEADER, "")], Role::User)]
    fn reads_user_and_role(#[case] pairs: &[(&'static str, &str)], #[case] role: Role) {
        let actor = actor_from_headers(&headers(pairs)).expect("authenticated");

        assert_eq!(actor.user_id.to_string(), USER);
        assert_eq!(actor.role, role);
    }

    #[rstest]
    #[::core::prelude::v1::test]
    #[case(&[])]
    #[case(&[(USER_ID_HEADER, "  ")])]
    #[case(&[(USER_ID_HEADER, "not-a-uuid")])]
    fn missing_or_malformed_identity_is_unauthorized(#[case] pairs: &[(&'static str, &str)]) {
        let err = actor_from_headers(&headers(pairs)).expect_err("unauthenticated");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[::core::prelude::v1::test]
    fn unknown_roles_are_forbidden() {
        let err = actor_from_headers(&headers(&[
            (USER_ID_HEADER, USER),
            (USER_ROLE_HEADER, "owner"),
        ]))
        .expect_err("unknown role");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[::core::prelude::v1::test]
    #[case(Role::User, false)]
    #[case(Role::Barista, false)]
    #[case(Role::Moderator, true)]
    #[case(Role::Admin, true)]
    fn moderation_requires_elevated_role(#[case] role: Role, #[case] allowed: bool) {
        let identity = Identity(Actor::new(UserId::random(), role));
        assert_eq!(identity.require_moderator().is_ok(), allowed);
    }

    #[actix_web::test]
    async fn extractor_rejects_anonymous_requests() {
        let app = test::init_service(App::new().route(
            "/",
            web::get().to(|identity: Identity| async move {
                HttpResponse::Ok().body(identity.actor().user_id.to_string())
            }),
        ))
        .await;

        let anonymous = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let request = test::TestRequest::get()
            .uri("/")
            .insert_header((USER_ID_HEADER, USER))
            .to_request();
        let body = test::call_and_read_body(&app, request).await;
        assert_eq!(body.as_ref(), USER.as_bytes());
    }
}
