//! Write-path scenarios: idempotent publish, visit verification and the
//! check-in guards, run against the in-memory datastore.

use std::time::Duration;

use backend::domain::checkins::{
    CheckInResponse, ClientContext, Confidence, GeoPoint, StartCheckInRequest,
    VerifyVisitRequest, VerifyVisitResponse,
};
use backend::domain::engagement::{
    AbuseReason, AbuseReportRequest, AbuseReportResponse, AbuseStatus, HelpfulVoteResponse,
};
use backend::domain::events::EventType;
use backend::domain::reviews::{
    RemoveReviewRequest, ReviewStatus, ReviewWriteResponse, UpdateReviewRequest,
};
use backend::domain::{Actor, CafeId, CheckInId, Error, ErrorCode, ReviewId, Role, UserId};
use futures::future::join_all;
use rstest::{fixture, rstest};

mod support;

use support::{World, body, code, key, north_of, point, publish_request};

#[fixture]
fn world() -> World {
    World::new()
}

async fn start_check_in(
    world: &World,
    actor: Actor,
    idempotency: &str,
    cafe_id: CafeId,
    at: GeoPoint,
) -> Result<CheckInResponse, Error> {
    world
        .check_ins
        .start(
            actor,
            key(idempotency),
            cafe_id,
            StartCheckInRequest {
                lat: at.lat,
                lng: at.lng,
            },
            ClientContext::default(),
        )
        .await
        .map(|response| body(&response))
}

#[rstest]
#[tokio::test]
async fn publishing_twice_with_one_key_replays_the_first_answer(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let actor = Actor::user(UserId::random());
    let request = publish_request(cafe_id, 5, "morning espresso");

    let first = world
        .reviews
        .publish(actor, key("k1"), request.clone())
        .await
        .expect("first publish");
    let replay = world
        .reviews
        .publish(actor, key("k1"), request.clone())
        .await
        .expect("replayed publish");

    assert_eq!(first.status, 201);
    assert!(!first.replayed);
    assert_eq!(replay.status, 201);
    assert!(replay.replayed);
    let created: ReviewWriteResponse = body(&first);
    let replayed: ReviewWriteResponse = body(&replay);
    assert_eq!(created.review_id, replayed.review_id);
    assert_eq!(created.event_type, EventType::ReviewCreated);
    assert_eq!(world.db.reviews().await.len(), 1);
    assert_eq!(world.db.outbox_events().await.len(), 1);

    let mut changed = request;
    changed.rating = 4;
    let conflict = world.reviews.publish(actor, key("k1"), changed).await;
    assert_eq!(code(conflict), ErrorCode::IdempotencyConflict);
}

#[rstest]
#[tokio::test]
async fn concurrent_retries_with_one_key_write_once(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let actor = Actor::user(UserId::random());
    let request = publish_request(cafe_id, 4, "flat white");

    let attempts = join_all((0..4).map(|_| {
        world
            .reviews
            .publish(actor, key("retry-storm"), request.clone())
    }))
    .await;

    let responses: Vec<_> = attempts
        .into_iter()
        .map(|attempt| attempt.expect("publish attempt"))
        .collect();
    assert_eq!(responses.iter().filter(|r| !r.replayed).count(), 1);
    let ids: Vec<ReviewId> = responses
        .iter()
        .map(|r| body::<ReviewWriteResponse>(r).review_id)
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(world.db.reviews().await.len(), 1);
    assert_eq!(world.db.outbox_events().await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn republishing_the_same_cafe_updates_the_existing_review(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let actor = Actor::user(UserId::random());

    let first = world.publish(actor, publish_request(cafe_id, 3, "first pass")).await;
    let second = world
        .reviews
        .publish(actor, key("again"), publish_request(cafe_id, 4, "second pass"))
        .await
        .expect("republish");

    let written: ReviewWriteResponse = body(&second);
    assert_eq!(second.status, 200);
    assert_eq!(written.review_id, first);
    assert_eq!(written.event_type, EventType::ReviewUpdated);
    assert_eq!(written.rating, 4);
    let reviews = world.db.reviews().await;
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating.get(), 4);
}

#[rstest]
#[tokio::test]
async fn rejected_publishes_do_not_spend_the_rate_limit(world: World) {
    let actor = Actor::user(UserId::random());
    let first = world.cafe_at(point(55.7558, 37.6173)).await;
    world.publish(actor, publish_request(first, 5, "house blend")).await;

    for (index, lat) in [55.76, 55.77].into_iter().enumerate() {
        let cafe_id = world.cafe_at(point(lat, 37.6173)).await;
        let duplicate = world
            .reviews
            .publish(
                actor,
                key(&format!("dup-{index}")),
                publish_request(cafe_id, 4, "house blend"),
            )
            .await;
        assert_eq!(code(duplicate), ErrorCode::Conflict);
    }

    let fresh_cafe = world.cafe_at(point(55.78, 37.6173)).await;
    let fresh = world
        .reviews
        .publish(actor, key("fresh"), publish_request(fresh_cafe, 4, "single origin"))
        .await
        .expect("fresh publish is not throttled");
    assert_eq!(fresh.status, 201);
    assert_eq!(world.db.reviews().await.len(), 2);
    assert_eq!(world.db.outbox_events().await.len(), 2);
}

#[rstest]
#[tokio::test]
async fn unknown_drink_names_are_recorded(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let mut request = publish_request(cafe_id, 5, "cascara");
    request.drink_name = Some("  Cascara   Fizz ".to_owned());

    world.publish(Actor::user(UserId::random()), request).await;

    let unknown = world
        .db
        .unknown_drink("cascara fizz")
        .await
        .expect("unknown drink recorded");
    assert_eq!(unknown.mentions_count, 1);
}

#[rstest]
#[tokio::test]
async fn partial_updates_keep_untouched_fields(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let actor = Actor::user(UserId::random());
    let review_id = world.publish(actor, publish_request(cafe_id, 2, "cold brew")).await;

    let response = world
        .reviews
        .update(
            actor,
            key("patch-1"),
            review_id,
            UpdateReviewRequest {
                rating: Some(5),
                ..UpdateReviewRequest::default()
            },
        )
        .await
        .expect("update review");

    let written: ReviewWriteResponse = body(&response);
    assert_eq!(written.rating, 5);
    assert_eq!(written.drink_name, "espresso");
    assert_eq!(written.taste_tags, vec!["citrus".to_owned()]);

    let stranger = world
        .reviews
        .update(
            Actor::user(UserId::random()),
            key("patch-2"),
            review_id,
            UpdateReviewRequest {
                rating: Some(1),
                ..UpdateReviewRequest::default()
            },
        )
        .await;
    assert_eq!(code(stranger), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn a_long_close_visit_verifies_with_high_confidence(world: World) {
    let cafe = point(55.7558, 37.6173);
    let cafe_id = world.cafe_at(cafe).await;
    let actor = Actor::user(UserId::random());
    let review_id = world.publish(actor, publish_request(cafe_id, 5, "flat white")).await;

    let check_in = start_check_in(&world, actor, "start-1", cafe_id, cafe)
        .await
        .expect("check-in starts");
    assert!(!check_in.existing);
    world.clock.advance(Duration::from_secs(11 * 60));

    let near = north_of(cafe, 40.0);
    let request = VerifyVisitRequest {
        checkin_id: check_in.checkin_id,
        lat: near.lat,
        lng: near.lng,
    };
    let first = world
        .check_ins
        .verify(actor, key("verify-1"), review_id, request)
        .await
        .expect("verify visit");
    let replay = world
        .check_ins
        .verify(actor, key("verify-1"), review_id, request)
        .await
        .expect("replayed verify");

    let verified: VerifyVisitResponse = body(&first);
    let replayed: VerifyVisitResponse = body(&replay);
    assert_eq!(verified.confidence, Confidence::High);
    assert_eq!(verified.dwell_seconds, 11 * 60);
    assert!((verified.distance_m - 40.0).abs() < 1.0);
    assert!(replay.replayed);
    assert_eq!(replayed.verification_id, verified.verification_id);

    let stored = world
        .db
        .visit_verification(review_id)
        .await
        .expect("verification row");
    assert_eq!(stored.confidence, Confidence::High);
    let visits: Vec<_> = world
        .db
        .outbox_events()
        .await
        .into_iter()
        .filter(|event| event.event_type == EventType::VisitVerified.as_str())
        .collect();
    assert_eq!(visits.len(), 1);
}

#[rstest]
#[tokio::test]
async fn verifying_too_early_is_rejected_with_a_retry_hint(world: World) {
    let cafe = point(55.7558, 37.6173);
    let cafe_id = world.cafe_at(cafe).await;
    let actor = Actor::user(UserId::random());
    let review_id = world.publish(actor, publish_request(cafe_id, 4, "cortado")).await;
    let check_in = start_check_in(&world, actor, "start-early", cafe_id, cafe)
        .await
        .expect("check-in starts");
    world.clock.advance(Duration::from_secs(2 * 60));

    let err = world
        .check_ins
        .verify(
            actor,
            key("verify-early"),
            review_id,
            VerifyVisitRequest {
                checkin_id: check_in.checkin_id,
                lat: cafe.lat,
                lng: cafe.lng,
            },
        )
        .await
        .expect_err("dwell too short");

    assert_eq!(err.code(), ErrorCode::Conflict);
    let retry_after = err
        .details()
        .and_then(|details| details.get("retry_after_seconds"))
        .and_then(serde_json::Value::as_i64);
    assert_eq!(retry_after, Some(3 * 60));
}

#[rstest]
#[tokio::test]
async fn a_second_cafe_waits_out_the_cooldown(world: World) {
    let first_cafe = point(55.7558, 37.6173);
    let second_cafe = north_of(first_cafe, 1_000.0);
    let c1 = world.cafe_at(first_cafe).await;
    let c2 = world.cafe_at(second_cafe).await;
    let actor = Actor::user(UserId::random());

    start_check_in(&world, actor, "c1", c1, first_cafe)
        .await
        .expect("first check-in");

    world.clock.advance(Duration::from_secs(2 * 60));
    let early = start_check_in(&world, actor, "c2-early", c2, second_cafe).await;
    assert_eq!(code(early), ErrorCode::CheckInCooldown);

    world.clock.advance(Duration::from_secs(4 * 60));
    let response = world
        .check_ins
        .start(
            actor,
            key("c2-later"),
            c2,
            StartCheckInRequest {
                lat: second_cafe.lat,
                lng: second_cafe.lng,
            },
            ClientContext::default(),
        )
        .await
        .expect("cooldown elapsed");
    assert_eq!(response.status, 200);
    assert!(!response.replayed);
    let later: CheckInResponse = body(&response);
    assert_eq!(later.cafe_id, c2);
    assert!(!later.existing);
}

#[rstest]
#[tokio::test]
async fn check_ins_outside_the_geofence_are_refused(world: World) {
    let cafe = point(55.7558, 37.6173);
    let cafe_id = world.cafe_at(cafe).await;

    let far = start_check_in(
        &world,
        Actor::user(UserId::random()),
        "far",
        cafe_id,
        north_of(cafe, 400.0),
    )
    .await;

    assert_eq!(code(far), ErrorCode::CheckInTooFar);
    assert!(world.db.checkins().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn implausible_travel_is_flagged_as_suspicious(world: World) {
    let first_cafe = point(55.7558, 37.6173);
    let distant_cafe = north_of(first_cafe, 50_000.0);
    let c1 = world.cafe_at(first_cafe).await;
    let c2 = world.cafe_at(distant_cafe).await;
    let actor = Actor::user(UserId::random());

    start_check_in(&world, actor, "near", c1, first_cafe)
        .await
        .expect("first check-in");
    world.clock.advance(Duration::from_secs(6 * 60));
    let jump = start_check_in(&world, actor, "jump", c2, distant_cafe).await;

    assert_eq!(code(jump), ErrorCode::CheckInSuspicious);
}

#[rstest]
#[tokio::test]
async fn restarting_at_the_same_cafe_resumes_the_open_check_in(world: World) {
    let cafe = point(55.7558, 37.6173);
    let cafe_id = world.cafe_at(cafe).await;
    let actor = Actor::user(UserId::random());

    let first = start_check_in(&world, actor, "open-1", cafe_id, cafe)
        .await
        .expect("first check-in");
    world.clock.advance(Duration::from_secs(60));
    let second = start_check_in(&world, actor, "open-2", cafe_id, cafe)
        .await
        .expect("resumed check-in");

    assert!(second.existing);
    assert_eq!(second.checkin_id, first.checkin_id);
    assert_eq!(world.db.checkins().await.len(), 1);
}

#[rstest]
#[tokio::test]
async fn confidence_never_drops_across_attempts(world: World) {
    let cafe = point(55.7558, 37.6173);
    let cafe_id = world.cafe_at(cafe).await;
    let actor = Actor::user(UserId::random());
    let review_id = world.publish(actor, publish_request(cafe_id, 5, "long stay")).await;

    let long = start_check_in(&world, actor, "long", cafe_id, cafe)
        .await
        .expect("check-in starts");
    world.clock.advance(Duration::from_secs(11 * 60));
    verify(&world, actor, "verify-long", review_id, long.checkin_id, cafe).await;

    let short = start_check_in(&world, actor, "short", cafe_id, cafe)
        .await
        .expect("second check-in starts");
    world.clock.advance(Duration::from_secs(5 * 60 + 30));
    let weaker = verify(&world, actor, "verify-short", review_id, short.checkin_id, cafe).await;

    assert_eq!(weaker.attempt_confidence, Confidence::Low);
    assert_eq!(weaker.confidence, Confidence::High);
    let stored = world
        .db
        .visit_verification(review_id)
        .await
        .expect("verification row");
    assert_eq!(stored.confidence, Confidence::High);
}

async fn verify(
    world: &World,
    actor: Actor,
    idempotency: &str,
    review_id: ReviewId,
    checkin_id: CheckInId,
    at: GeoPoint,
) -> VerifyVisitResponse {
    let response = world
        .check_ins
        .verify(
            actor,
            key(idempotency),
            review_id,
            VerifyVisitRequest {
                checkin_id,
                lat: at.lat,
                lng: at.lng,
            },
        )
        .await
        .expect("verify visit");
    body(&response)
}

#[rstest]
#[tokio::test]
async fn helpful_votes_are_unique_per_voter(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let author = Actor::user(UserId::random());
    let voter = Actor::user(UserId::random());
    let review_id = world.publish(author, publish_request(cafe_id, 5, "ristretto")).await;

    let first = world
        .engagement
        .vote_helpful(voter, key("vote-1"), review_id)
        .await
        .expect("first vote");
    let again = world
        .engagement
        .vote_helpful(voter, key("vote-2"), review_id)
        .await
        .expect("second vote");

    let created: HelpfulVoteResponse = body(&first);
    let existing: HelpfulVoteResponse = body(&again);
    assert_eq!(first.status, 201);
    assert!(!created.already_exists);
    assert_eq!(again.status, 200);
    assert!(existing.already_exists);
    assert_eq!(existing.vote_id, created.vote_id);
    assert_eq!(world.db.helpful_votes().await.len(), 1);

    let own = world
        .engagement
        .vote_helpful(author, key("vote-own"), review_id)
        .await;
    assert_eq!(code(own), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn abuse_reports_are_confirmed_once_by_a_moderator(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let author = Actor::user(UserId::random());
    let reporter = Actor::user(UserId::random());
    let review_id = world.publish(author, publish_request(cafe_id, 5, "suspicious praise")).await;
    let request = || AbuseReportRequest {
        reason: AbuseReason::Fake,
        details: Some("  same text on five cafés ".to_owned()),
    };

    let filed = world
        .engagement
        .report_abuse(reporter, key("report-1"), review_id, request())
        .await
        .expect("file report");
    let refiled = world
        .engagement
        .report_abuse(reporter, key("report-2"), review_id, request())
        .await
        .expect("refile report");
    let own = world
        .engagement
        .report_abuse(author, key("report-own"), review_id, request())
        .await;

    let report: AbuseReportResponse = body(&filed);
    let duplicate: AbuseReportResponse = body(&refiled);
    assert_eq!(filed.status, 201);
    assert_eq!(report.status, AbuseStatus::Open);
    assert!(duplicate.already_exists);
    assert_eq!(duplicate.report_id, report.report_id);
    assert_eq!(code(own), ErrorCode::Forbidden);
    let stored = world.db.abuse_reports().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].details.as_deref(), Some("same text on five cafés"));

    let by_user = world
        .engagement
        .confirm_abuse(reporter, key("confirm-user"), report.report_id)
        .await;
    assert_eq!(code(by_user), ErrorCode::Forbidden);

    let moderator = Actor::new(UserId::random(), Role::Moderator);
    let confirmed = world
        .engagement
        .confirm_abuse(moderator, key("confirm-1"), report.report_id)
        .await
        .expect("confirm report");
    let reconfirmed = world
        .engagement
        .confirm_abuse(moderator, key("confirm-2"), report.report_id)
        .await
        .expect("confirm again");

    let first: AbuseReportResponse = body(&confirmed);
    let second: AbuseReportResponse = body(&reconfirmed);
    assert_eq!(first.status, AbuseStatus::Confirmed);
    assert!(!first.already_exists);
    assert!(second.already_exists);
    let confirmations: Vec<_> = world
        .db
        .outbox_events()
        .await
        .into_iter()
        .filter(|event| event.event_type == EventType::AbuseConfirmed.as_str())
        .collect();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(
        confirmations[0].dedupe_key,
        format!("abuse-confirmed:{}", report.report_id)
    );
    assert_eq!(confirmations[0].aggregate_id, *cafe_id.as_uuid());
}

#[rstest]
#[tokio::test]
async fn only_moderators_remove_reviews(world: World) {
    let cafe_id = world.cafe_at(point(55.7558, 37.6173)).await;
    let author = Actor::user(UserId::random());
    let review_id = world.publish(author, publish_request(cafe_id, 1, "burnt beans")).await;

    let by_author = world
        .reviews
        .remove(author, key("rm-1"), review_id, RemoveReviewRequest::default())
        .await;
    assert_eq!(code(by_author), ErrorCode::Forbidden);

    let moderator = Actor::new(UserId::random(), Role::Moderator);
    world
        .reviews
        .remove(
            moderator,
            key("rm-2"),
            review_id,
            RemoveReviewRequest {
                reason: Some("spam".to_owned()),
            },
        )
        .await
        .expect("moderator removes");

    let reviews = world.db.reviews().await;
    assert_eq!(reviews[0].status, ReviewStatus::Removed);
    let penalties = world.db.reputation_of(author.user_id).await;
    assert_eq!(penalties.len(), 1);
    assert!(penalties[0].points < 0);
}
