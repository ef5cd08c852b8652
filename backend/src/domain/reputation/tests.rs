//! Tests for score derivation and the ledger read path.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mockable::MockClock;
use rstest::{fixture, rstest};
use serde_json::Value;
use uuid::Uuid;

use super::*;
use crate::domain::checkins::Confidence;
use crate::domain::ports::MockReputationRepository;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("valid timestamp"))
}

fn event(
    event_type: ReputationEventType,
    points: i32,
    created_at: DateTime<Utc>,
) -> ReputationEvent {
    ReputationEvent {
        id: Uuid::new_v4(),
        user_id: UserId::random(),
        event_type,
        source_type: event_type.source_type().to_owned(),
        source_id: Uuid::new_v4(),
        points,
        metadata: Value::Null,
        created_at,
    }
}

#[rstest]
fn older_events_contribute_strictly_less(now: DateTime<Utc>) {
    let fresh = compute_score(
        &[event(ReputationEventType::AbuseConfirmed, -25, now - Duration::days(50))],
        now,
    );
    assert_eq!(fresh, 0.0);

    let recent = compute_score(
        &[event(ReputationEventType::HelpfulReceived, 10, now - Duration::days(50))],
        now,
    );
    let ancient = compute_score(
        &[event(ReputationEventType::HelpfulReceived, 10, now - Duration::days(400))],
        now,
    );
    assert_eq!(recent, 10.0);
    assert!((ancient - 2.0).abs() < 1e-9);
    assert!(ancient < recent);
}

#[rstest]
fn daily_caps_scale_the_whole_day(now: DateTime<Utc>) {
    let day = now - Duration::days(1);
    let events: Vec<_> = (0..15)
        .map(|_| event(ReputationEventType::HelpfulReceived, 2, day))
        .collect();
    let score = compute_score(&events, now);
    assert!((score - 20.0).abs() < 1e-9);
}

#[rstest]
fn caps_apply_per_event_type(now: DateTime<Utc>) {
    let day = now - Duration::days(2);
    let mut events: Vec<_> = (0..10)
        .map(|_| event(ReputationEventType::VisitVerified, 6, day))
        .collect();
    events.push(event(ReputationEventType::HelpfulReceived, 3, day));
    let score = compute_score(&events, now);
    assert!((score - 27.0).abs() < 1e-9);
}

#[rstest]
fn penalties_are_never_capped_and_scores_floor_at_zero(now: DateTime<Utc>) {
    let events = vec![
        event(ReputationEventType::VisitVerified, 6, now),
        event(ReputationEventType::ReviewRemoved, REVIEW_REMOVED_POINTS, now),
        event(ReputationEventType::AbuseConfirmed, ABUSE_CONFIRMED_POINTS, now),
    ];
    assert_eq!(compute_score(&events, now), 0.0);
}

#[rstest]
fn score_is_clamped_to_the_maximum(now: DateTime<Utc>) {
    let events: Vec<_> = (0..200)
        .map(|day| event(ReputationEventType::VisitVerified, 8, now - Duration::days(day % 90)))
        .collect();
    assert_eq!(compute_score(&events, now), SCORE_MAX);
}

#[rstest]
#[case(0.0, ReputationTier::Participant)]
#[case(40.0, ReputationTier::Active)]
#[case(250.0, ReputationTier::Verified)]
#[case(699.99, ReputationTier::Expert)]
#[case(1000.0, ReputationTier::Legend)]
fn tiers_follow_thresholds(#[case] score: f64, #[case] tier: ReputationTier) {
    assert_eq!(ReputationTier::for_score(score), tier);
}

#[rstest]
#[case(Confidence::None, false, 0)]
#[case(Confidence::Low, false, 1)]
#[case(Confidence::Medium, false, 3)]
#[case(Confidence::High, false, 6)]
#[case(Confidence::High, true, 8)]
fn visit_points_by_confidence(
    #[case] confidence: Confidence,
    #[case] admin: bool,
    #[case] points: i32,
) {
    assert_eq!(visit_verified_points(confidence, admin), points);
}

#[rstest]
#[tokio::test]
async fn summary_reports_tier_and_trust(now: DateTime<Utc>) {
    let user_id = UserId::random();
    let mut repository = MockReputationRepository::new();
    repository.expect_events_for_user().returning(move |_| {
        Ok((0..6)
            .map(|day| event(ReputationEventType::VisitVerified, 24, now - Duration::days(day)))
            .collect())
    });
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now);

    let ledger = ReputationLedger::new(Arc::new(repository), Arc::new(clock));
    let summary = ledger
        .summary(user_id)
        .await
        .unwrap_or_else(|err| panic!("summary: {err}"));

    assert_eq!(summary.score, 144.0);
    assert_eq!(summary.tier, ReputationTier::Trusted);
    assert_eq!(summary.badge, "Надёжный");
    assert!(summary.is_trusted);
    assert_eq!(summary.events_count, 6);
}
