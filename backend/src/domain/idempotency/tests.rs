//! Unit tests for idempotency primitives.

use super::*;
use rstest::rstest;
use serde_json::json;

fn hash_of(value: &Value) -> RequestHash {
    hash_request(value).expect("hash request")
}

fn completed(hash: RequestHash, status: i32, body: Value) -> StoredIdempotency {
    StoredIdempotency {
        request_hash: hash,
        response_status: status,
        response_body: body,
    }
}

#[rstest]
#[case("k1", "k1")]
#[case("  spaced-key\t", "spaced-key")]
fn keys_are_trimmed(#[case] raw: &str, #[case] expected: &str) {
    let key = IdempotencyKey::new(raw).expect("valid key");
    assert_eq!(key.as_ref(), expected);
}

#[rstest]
#[case("", IdempotencyKeyValidationError::EmptyKey)]
#[case("  ", IdempotencyKeyValidationError::EmptyKey)]
#[case("a\u{0007}b", IdempotencyKeyValidationError::ControlCharacters)]
fn keys_reject_invalid_input(#[case] raw: &str, #[case] expected: IdempotencyKeyValidationError) {
    assert_eq!(IdempotencyKey::new(raw), Err(expected));
}

#[rstest]
fn keys_reject_overlong_input() {
    let raw = "k".repeat(IDEMPOTENCY_KEY_MAX_LEN + 1);
    assert_eq!(
        IdempotencyKey::new(raw),
        Err(IdempotencyKeyValidationError::TooLong {
            max: IDEMPOTENCY_KEY_MAX_LEN
        })
    );
    let at_limit = "k".repeat(IDEMPOTENCY_KEY_MAX_LEN);
    assert!(IdempotencyKey::new(at_limit).is_ok());
}

#[rstest]
fn key_order_does_not_change_the_hash() {
    let a = json!({"rating": 5, "cafe": {"id": "c1", "name": "x"}});
    let b = json!({"cafe": {"name": "x", "id": "c1"}, "rating": 5});
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[rstest]
fn different_payloads_hash_differently() {
    assert_ne!(hash_of(&json!({"rating": 5})), hash_of(&json!({"rating": 4})));
}

#[rstest]
fn hashes_survive_the_hex_round_trip() {
    let hash = hash_of(&json!({"summary": "flat white"}));
    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(RequestHash::from_hex(&hex), Ok(hash));
    assert_eq!(
        RequestHash::from_hex("zz"),
        Err(RequestHashError::InvalidHex)
    );
}

#[rstest]
fn scopes_are_suffixed_with_the_user() {
    let user = UserId::random();
    for kind in ScopeKind::ALL {
        let scope = IdempotencyScope::new(kind, user);
        assert_eq!(scope.as_str(), format!("{}:{user}", kind.as_str()));
    }
}

#[rstest]
fn matching_completed_slot_replays() {
    let hash = hash_of(&json!({"rating": 5}));
    let stored = completed(hash, 201, json!({"review_id": "r1"}));
    let response = resolve_existing(&stored, &hash).expect("replay");
    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({"review_id": "r1"}));
}

#[rstest]
fn mismatched_hash_is_a_conflict_even_while_in_flight() {
    let stored = completed(hash_of(&json!({"rating": 5})), IN_FLIGHT_STATUS, json!({}));
    let err = resolve_existing(&stored, &hash_of(&json!({"rating": 4})))
        .expect_err("conflict expected");
    assert_eq!(err.code(), crate::domain::ErrorCode::IdempotencyConflict);
}

#[rstest]
fn in_flight_slot_is_reported_in_progress() {
    let hash = hash_of(&json!({"rating": 5}));
    let stored = completed(hash, IN_FLIGHT_STATUS, json!({}));
    let err = resolve_existing(&stored, &hash).expect_err("in progress expected");
    assert_eq!(err.code(), crate::domain::ErrorCode::IdempotencyInProgress);
}

#[rstest]
fn request_scopes_and_hashes_the_body() {
    let user = UserId::random();
    let key = IdempotencyKey::new("k1").expect("valid key");
    let body = json!({"rating": 5});
    let request =
        IdempotentRequest::new(ScopeKind::ReviewPublish, user, key.clone(), &body).expect("request");
    assert_eq!(request.key, key);
    assert_eq!(request.request_hash, hash_of(&body));
    assert!(request.scope.as_str().starts_with("review.publish:"));
}

#[rstest]
fn responses_flag_replays() {
    let response = MutationResponse::created(&json!({"ok": true})).expect("response");
    assert!(!IdempotentResponse::fresh(response.clone()).replayed);
    let replay = IdempotentResponse::replayed(response);
    assert!(replay.replayed);
    assert_eq!(replay.status, 201);
}
