//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer together with
//! the schema wrappers from [`crate::inbound::http::schemas`], so domain types
//! stay free of utoipa derives. The document is served as JSON at
//! `/api-docs/openapi.json`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{
    AbuseReportSchema, ConfirmPhotoSchema, ErrorCodeSchema, ErrorSchema, PresignPhotoSchema,
    PublishReviewSchema, RemoveReviewSchema, StartCheckInSchema, UpdateReviewSchema,
    VerifyVisitSchema,
};

/// Adds the identity headers set by the upstream identity provider.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "UserId",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-User-Id",
                "Authenticated user id injected by the identity provider.",
            ))),
        );
        components.add_security_scheme(
            "UserRole",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-User-Role",
                "Optional role: user, barista, moderator or admin.",
            ))),
        );
    }
}

/// OpenAPI document for the reviews REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Gde kofe reviews API",
        description = "Review publishing, visit verification, engagement, photos and café ratings."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("UserId" = [])),
    paths(
        crate::inbound::http::reviews::publish_review,
        crate::inbound::http::reviews::update_review,
        crate::inbound::http::reviews::remove_review,
        crate::inbound::http::checkins::start_check_in,
        crate::inbound::http::checkins::verify_visit,
        crate::inbound::http::engagement::vote_helpful,
        crate::inbound::http::engagement::report_abuse,
        crate::inbound::http::engagement::confirm_abuse,
        crate::inbound::http::photos::presign_photo,
        crate::inbound::http::photos::confirm_photo,
        crate::inbound::http::photos::photo_status,
        crate::inbound::http::cafes::list_cafe_reviews,
        crate::inbound::http::cafes::cafe_rating,
        crate::inbound::http::cafes::user_reputation,
        crate::inbound::http::admin::list_dlq,
        crate::inbound::http::admin::replay_dlq,
        crate::inbound::http::admin::recompute_rating,
        crate::inbound::http::admin::ai_health,
        crate::inbound::http::admin::versioning,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PublishReviewSchema,
        UpdateReviewSchema,
        RemoveReviewSchema,
        StartCheckInSchema,
        VerifyVisitSchema,
        AbuseReportSchema,
        PresignPhotoSchema,
        ConfirmPhotoSchema
    )),
    tags(
        (name = "reviews", description = "Publishing, editing and removing reviews"),
        (name = "check-ins", description = "Geofenced check-ins and visit verification"),
        (name = "engagement", description = "Helpful votes and abuse reports"),
        (name = "photos", description = "Review photo uploads"),
        (name = "cafes", description = "Review feeds and rating snapshots"),
        (name = "reputation", description = "User reputation"),
        (name = "admin", description = "Operator endpoints"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

/// Serve the generated document.
#[actix_web::get("/api-docs/openapi.json")]
pub async fn openapi_json() -> actix_web::HttpResponse {
    actix_web::HttpResponse::Ok().json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    use super::*;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "trace_id");
    }

    #[rstest]
    #[case("/reviews")]
    #[case("/reviews/{id}")]
    #[case("/reviews/{id}/visit/verify")]
    #[case("/reviews/abuse/{id}/confirm")]
    #[case("/reviews/photos/presign")]
    #[case("/cafes/{id}/reviews")]
    #[case("/admin/events/dlq/{id}/replay")]
    #[case("/health/ready")]
    fn documents_endpoint(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[test]
    fn declares_identity_header_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("UserId"));
    }
}
