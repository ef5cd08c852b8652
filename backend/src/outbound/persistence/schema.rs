//! Diesel table definitions for the reviews-core schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Cafés known to the platform. Owned by the catalogue service; read here
    /// for existence checks and geofencing.
    cafes (id) {
        id -> Uuid,
        name -> Varchar,
        lat -> Float8,
        lng -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Display names for review authors.
    users (id) {
        id -> Uuid,
        display_name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Drinks catalogue.
    drinks (id) {
        id -> Uuid,
        name -> Varchar,
        aliases -> Array<Text>,
        popularity_rank -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Free-form drink names that matched no catalogue entry.
    ///
    /// `name` holds the canonical form and is unique.
    drink_unknown_formats (id) {
        id -> Uuid,
        name -> Varchar,
        mentions_count -> Int4,
        first_seen_at -> Timestamptz,
        last_seen_at -> Timestamptz,
        last_user_id -> Nullable<Uuid>,
        status -> Varchar,
        mapped_drink_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// Reviews. A partial unique index keeps one published review per
    /// `(user_id, cafe_id)`.
    reviews (id) {
        id -> Uuid,
        user_id -> Uuid,
        cafe_id -> Uuid,
        rating -> Int2,
        summary -> Text,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// 1:1 review attributes.
    review_attributes (review_id) {
        review_id -> Uuid,
        drink_id -> Nullable<Uuid>,
        drink_name -> Varchar,
        taste_tags -> Array<Text>,
        summary_length -> Int4,
        summary_fingerprint -> Varchar,
        photo_count -> Int4,
    }
}

diesel::table! {
    /// Ordered review photos.
    review_photos (review_id, position) {
        review_id -> Uuid,
        position -> Int4,
        photo_url -> Text,
    }
}

diesel::table! {
    /// Check-ins started at a café and later verified against a review.
    review_checkins (id) {
        id -> Uuid,
        user_id -> Uuid,
        cafe_id -> Uuid,
        status -> Varchar,
        started_at -> Timestamptz,
        start_lat -> Float8,
        start_lng -> Float8,
        start_distance_m -> Float8,
        verified_at -> Nullable<Timestamptz>,
        verified_review_id -> Nullable<Uuid>,
        verify_lat -> Nullable<Float8>,
        verify_lng -> Nullable<Float8>,
        verify_distance_m -> Nullable<Float8>,
        dwell_seconds -> Nullable<Int8>,
        confidence -> Nullable<Varchar>,
        risk_flags -> Array<Text>,
        user_agent_hash -> Nullable<Varchar>,
        ip_prefix -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Best visit confidence reached per review (unique on `review_id`).
    visit_verifications (id) {
        id -> Uuid,
        review_id -> Uuid,
        user_id -> Uuid,
        cafe_id -> Uuid,
        confidence -> Varchar,
        verified_at -> Nullable<Timestamptz>,
        dwell_seconds -> Int8,
    }
}

diesel::table! {
    /// Helpful votes, unique on `(review_id, voter_user_id)`.
    helpful_votes (id) {
        id -> Uuid,
        review_id -> Uuid,
        voter_user_id -> Uuid,
        weight -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Abuse reports, unique on `(review_id, reporter_user_id)`.
    abuse_reports (id) {
        id -> Uuid,
        review_id -> Uuid,
        reporter_user_id -> Uuid,
        reason -> Varchar,
        details -> Nullable<Text>,
        status -> Varchar,
        confirmed_by -> Nullable<Uuid>,
        confirmed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency slots. `response_status = 0` marks an in-flight mutation.
    idempotency_keys (scope, key) {
        scope -> Varchar,
        key -> Varchar,
        request_hash -> Varchar,
        response_status -> Int4,
        response_body -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Transactional outbox. `dedupe_key` is unique.
    domain_events (id) {
        id -> Uuid,
        event_type -> Varchar,
        aggregate_type -> Varchar,
        aggregate_id -> Uuid,
        dedupe_key -> Varchar,
        payload -> Jsonb,
        status -> Varchar,
        attempts -> Int4,
        available_at -> Timestamptz,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-consumer inbox, unique on `(outbox_event_id, consumer)`.
    domain_event_inbox (id) {
        id -> Uuid,
        outbox_event_id -> Uuid,
        consumer -> Varchar,
        event_type -> Varchar,
        aggregate_id -> Uuid,
        payload -> Jsonb,
        status -> Varchar,
        attempts -> Int4,
        available_at -> Timestamptz,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Dead letters, unique on `(outbox_event_id, consumer)`.
    domain_event_dlq (id) {
        id -> Uuid,
        outbox_event_id -> Uuid,
        consumer -> Varchar,
        event_type -> Varchar,
        aggregate_id -> Uuid,
        payload -> Jsonb,
        attempts -> Int4,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
        resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// One rating snapshot per café.
    cafe_rating_snapshots (cafe_id) {
        cafe_id -> Uuid,
        formula_version -> Varchar,
        rating -> Float8,
        reviews_count -> Int4,
        verified_reviews_count -> Int4,
        fraud_risk -> Float8,
        components -> Jsonb,
        computed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only reputation ledger, unique on
    /// `(user_id, event_type, source_type, source_id)`.
    reputation_events (id) {
        id -> Uuid,
        user_id -> Uuid,
        event_type -> Varchar,
        source_type -> Varchar,
        source_id -> Uuid,
        points -> Int4,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Review photo uploads and their optimisation state.
    review_photo_uploads (id) {
        id -> Uuid,
        user_id -> Uuid,
        temp_object_key -> Text,
        status -> Varchar,
        final_object_key -> Nullable<Text>,
        mime_type -> Varchar,
        size_bytes -> Int8,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(reviews -> cafes (cafe_id));
diesel::joinable!(review_attributes -> reviews (review_id));
diesel::joinable!(visit_verifications -> reviews (review_id));
diesel::joinable!(review_photos -> reviews (review_id));
diesel::joinable!(helpful_votes -> reviews (review_id));
diesel::joinable!(abuse_reports -> reviews (review_id));
diesel::joinable!(domain_event_inbox -> domain_events (outbox_event_id));
diesel::joinable!(domain_event_dlq -> domain_events (outbox_event_id));

diesel::allow_tables_to_appear_in_same_query!(
    abuse_reports,
    cafe_rating_snapshots,
    cafes,
    domain_event_dlq,
    domain_event_inbox,
    domain_events,
    drink_unknown_formats,
    drinks,
    helpful_votes,
    idempotency_keys,
    reputation_events,
    review_attributes,
    review_checkins,
    review_photo_uploads,
    review_photos,
    reviews,
    users,
    visit_verifications,
);
