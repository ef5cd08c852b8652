//! Tests for the snapshot engine.

use chrono::TimeZone;
use mockable::MockClock;
use mockall::predicate::eq;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::checkins::Confidence;
use crate::domain::ports::{
    MockRatingRepository, MockReputationRepository, MockReviewSummarizer, StoreError,
    SummarizerError,
};
use crate::domain::rating::SuggestedTag;
use crate::domain::{ErrorCode, ReviewId};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 10, 8, 30, 0)
        .single()
        .unwrap_or_else(|| panic!("valid timestamp"))
}

fn review(rating: u8, now: DateTime<Utc>) -> ReviewFacts {
    ReviewFacts {
        review_id: ReviewId::random(),
        author_id: UserId::random(),
        author_display_name: Some("Аня".to_owned()),
        rating,
        summary: "Хороший фильтр, приветливый бариста и тихий зал".to_owned(),
        summary_length: 48,
        drink_name: "filter".to_owned(),
        tags_count: 2,
        photo_count: 1,
        confidence: Confidence::Medium,
        confirmed_reports: 0,
        helpful_score: 1.0,
        created_at: now,
    }
}

fn inputs(count: usize, now: DateTime<Utc>) -> CafeRatingInputs {
    CafeRatingInputs {
        reviews: (0..count).map(|_| review(5, now)).collect(),
        global_mean: Some(4.0),
    }
}

fn quiet_reputation() -> MockReputationRepository {
    let mut reputation = MockReputationRepository::new();
    reputation
        .expect_events_for_user()
        .returning(|_| Ok(Vec::new()));
    reputation
}

fn disabled_summarizer() -> MockReviewSummarizer {
    let mut summarizer = MockReviewSummarizer::new();
    summarizer.expect_model().returning(|| None);
    summarizer.expect_descriptive_tags().never();
    summarizer
}

fn engine(
    ratings: MockRatingRepository,
    reputation: MockReputationRepository,
    summarizer: MockReviewSummarizer,
    settings: &FormulaSettings,
    now: DateTime<Utc>,
) -> RatingEngine {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now);
    RatingEngine::new(
        Arc::new(ratings),
        Arc::new(reputation),
        Arc::new(summarizer),
        settings,
        Arc::new(clock),
    )
}

#[rstest]
#[tokio::test]
async fn unknown_cafes_have_no_snapshot(now: DateTime<Utc>) {
    let mut ratings = MockRatingRepository::new();
    ratings.expect_cafe_exists().returning(|_| Ok(false));

    let err = engine(
        ratings,
        quiet_reputation(),
        disabled_summarizer(),
        &FormulaSettings::default(),
        now,
    )
    .snapshot(CafeId::random())
    .await
    .err()
    .unwrap_or_else(|| panic!("expected not_found"));
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn stored_snapshots_are_returned_as_is(now: DateTime<Utc>) {
    let cafe_id = CafeId::random();
    let stored = assemble_snapshot(
        cafe_id,
        &inputs(2, now),
        &HashMap::new(),
        &FormulaSettings::default().resolve(),
        None,
        now,
    );
    let returned = stored.clone();
    let mut ratings = MockRatingRepository::new();
    ratings.expect_cafe_exists().returning(|_| Ok(true));
    ratings
        .expect_find_snapshot()
        .with(eq(cafe_id))
        .return_once(move |_| Ok(Some(returned)));
    ratings.expect_upsert_snapshot().never();

    let snapshot = engine(
        ratings,
        quiet_reputation(),
        disabled_summarizer(),
        &FormulaSettings::default(),
        now,
    )
    .snapshot(cafe_id)
    .await
    .unwrap_or_else(|err| panic!("snapshot: {err}"));
    assert_eq!(snapshot, stored);
}

#[rstest]
#[tokio::test]
async fn missing_snapshots_are_computed_and_stored(now: DateTime<Utc>) {
    let cafe_id = CafeId::random();
    let mut ratings = MockRatingRepository::new();
    ratings.expect_cafe_exists().returning(|_| Ok(true));
    ratings.expect_find_snapshot().returning(|_| Ok(None));
    ratings.expect_load_inputs().returning(|_| {
        Ok(CafeRatingInputs {
            reviews: Vec::new(),
            global_mean: None,
        })
    });
    ratings
        .expect_upsert_snapshot()
        .withf(|snapshot| snapshot.reviews_count == 0)
        .times(1)
        .returning(|_| Ok(()));

    let snapshot = engine(
        ratings,
        quiet_reputation(),
        disabled_summarizer(),
        &FormulaSettings::default(),
        now,
    )
    .snapshot(cafe_id)
    .await
    .unwrap_or_else(|err| panic!("snapshot: {err}"));

    assert_eq!(snapshot.rating, 0.0);
    assert_eq!(snapshot.components.reason.as_deref(), Some(NO_REVIEWS_REASON));
    assert_eq!(snapshot.formula_version, "rating_v2");
    assert_eq!(snapshot.computed_at, now);
}

#[rstest]
#[tokio::test]
async fn enabled_summariser_adds_descriptive_tags(now: DateTime<Utc>) {
    let mut ratings = MockRatingRepository::new();
    ratings
        .expect_load_inputs()
        .returning(move |_| Ok(inputs(3, now)));
    ratings
        .expect_upsert_snapshot()
        .withf(|snapshot| {
            snapshot
                .components
                .descriptive_tags
                .as_ref()
                .is_some_and(|tags| tags.len() == 1 && tags[0].source == "gpt-test")
        })
        .times(1)
        .returning(|_| Ok(()));
    let mut summarizer = MockReviewSummarizer::new();
    summarizer
        .expect_model()
        .returning(|| Some("gpt-test".to_owned()));
    summarizer
        .expect_descriptive_tags()
        .withf(|summaries| summaries.len() == 3)
        .times(1)
        .returning(|_| {
            Ok(vec![SuggestedTag {
                label: "Quiet hall".to_owned(),
                score: 0.8,
                support_count: 3,
            }])
        });

    let engine = engine(
        ratings,
        quiet_reputation(),
        summarizer,
        &FormulaSettings::default(),
        now,
    );
    engine
        .recompute(CafeId::random())
        .await
        .unwrap_or_else(|err| panic!("recompute: {err}"));

    let health = engine.ai_health();
    assert!(health.enabled);
    assert_eq!(health.last_success_at, Some(now));
    assert!(health.last_error.is_none());
}

#[rstest]
#[tokio::test]
async fn summariser_failures_are_recorded_not_raised(now: DateTime<Utc>) {
    let mut ratings = MockRatingRepository::new();
    ratings
        .expect_load_inputs()
        .returning(move |_| Ok(inputs(4, now)));
    ratings
        .expect_upsert_snapshot()
        .withf(|snapshot| snapshot.components.descriptive_tags.is_none())
        .returning(|_| Ok(()));
    let mut summarizer = MockReviewSummarizer::new();
    summarizer
        .expect_model()
        .returning(|| Some("gpt-test".to_owned()));
    summarizer
        .expect_descriptive_tags()
        .returning(|_| Err(SummarizerError::transport("timed out")));

    let engine = engine(
        ratings,
        quiet_reputation(),
        summarizer,
        &FormulaSettings::default(),
        now,
    );
    let snapshot = engine
        .recompute(CafeId::random())
        .await
        .unwrap_or_else(|err| panic!("recompute: {err}"));

    assert_eq!(snapshot.reviews_count, 4);
    let health = engine.ai_health();
    assert_eq!(health.last_error_at, Some(now));
    assert!(health.last_error.is_some_and(|message| message.contains("timed out")));
}

#[rstest]
#[tokio::test]
async fn small_cafes_skip_the_summariser(now: DateTime<Utc>) {
    let mut ratings = MockRatingRepository::new();
    ratings
        .expect_load_inputs()
        .returning(move |_| Ok(inputs(2, now)));
    ratings.expect_upsert_snapshot().returning(|_| Ok(()));
    let mut summarizer = MockReviewSummarizer::new();
    summarizer
        .expect_model()
        .returning(|| Some("gpt-test".to_owned()));
    summarizer.expect_descriptive_tags().never();

    engine(
        ratings,
        quiet_reputation(),
        summarizer,
        &FormulaSettings::default(),
        now,
    )
    .recompute(CafeId::random())
    .await
    .unwrap_or_else(|err| panic!("recompute: {err}"));
}

#[rstest]
#[tokio::test]
async fn gated_versions_are_recorded_as_fallbacks(now: DateTime<Utc>) {
    let mut ratings = MockRatingRepository::new();
    ratings
        .expect_load_inputs()
        .returning(move |_| Ok(inputs(1, now)));
    ratings.expect_upsert_snapshot().returning(|_| Ok(()));
    let settings = FormulaSettings {
        rating_version: "rating_v3".to_owned(),
        quality_version: "quality_v2".to_owned(),
    };

    let engine = engine(ratings, quiet_reputation(), disabled_summarizer(), &settings, now);
    let snapshot = engine
        .recompute(CafeId::random())
        .await
        .unwrap_or_else(|err| panic!("recompute: {err}"));

    assert_eq!(snapshot.formula_version, "rating_v2");
    assert_eq!(snapshot.components.formula_fallbacks.len(), 2);
    assert_eq!(engine.versioning_status().requested_rating_version, "rating_v3");
}

#[rstest]
#[tokio::test]
async fn rebuild_counts_failed_cafes(now: DateTime<Utc>) {
    let healthy = CafeId::random();
    let broken = CafeId::random();
    let mut ratings = MockRatingRepository::new();
    ratings
        .expect_list_cafe_ids()
        .returning(move || Ok(vec![healthy, broken]));
    ratings.expect_load_inputs().returning(move |cafe_id| {
        if cafe_id == broken {
            Err(StoreError::query("relation missing"))
        } else {
            Ok(inputs(1, now))
        }
    });
    ratings.expect_upsert_snapshot().times(1).returning(|_| Ok(()));

    let report = engine(
        ratings,
        quiet_reputation(),
        disabled_summarizer(),
        &FormulaSettings::default(),
        now,
    )
    .rebuild_all()
    .await
    .unwrap_or_else(|err| panic!("rebuild: {err}"));

    assert_eq!(report, RebuildReport { cafes: 2, failed: 1 });
}
