//! Tests for the rating formulas.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::checkins::Confidence;
use crate::domain::{ReviewId, UserId};

#[fixture]
fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("valid timestamp"))
}

fn facts(rating: u8, confidence: Confidence, created_at: DateTime<Utc>) -> ReviewFacts {
    ReviewFacts {
        review_id: ReviewId::random(),
        author_id: UserId::random(),
        author_display_name: None,
        rating,
        summary: "Плотный эспрессо с шоколадным послевкусием".to_owned(),
        summary_length: 40,
        drink_name: "espresso".to_owned(),
        tags_count: 0,
        photo_count: 0,
        confidence,
        confirmed_reports: 0,
        helpful_score: 0.0,
        created_at,
    }
}

#[rstest]
fn quality_weights_each_component(created_at: DateTime<Utc>) {
    let mut review = facts(5, Confidence::High, created_at);
    review.tags_count = 7;
    review.summary_length = 200;
    review.photo_count = 3;
    assert_eq!(quality_v1(&review).score, 100);

    review.confirmed_reports = 2;
    assert_eq!(quality_v1(&review).score, 60);
}

#[rstest]
#[case(59, 20)]
#[case(60, 30)]
#[case(100, 38)]
#[case(180, 45)]
fn quality_text_bands(created_at: DateTime<Utc>, #[case] length: u32, #[case] expected: u8) {
    let mut review = facts(4, Confidence::None, created_at);
    review.summary_length = length;
    assert_eq!(quality_v1(&review).score, expected);
}

#[rstest]
fn unmapped_drink_names_still_count(created_at: DateTime<Utc>) {
    let mut review = facts(4, Confidence::None, created_at);
    review.drink_name = "lavender raf".to_owned();
    assert_eq!(quality_v1(&review).drink, 1.0);
    review.drink_name = "  ".to_owned();
    assert_eq!(quality_v1(&review).drink, 0.0);
}

#[rstest]
fn quality_never_goes_negative(created_at: DateTime<Utc>) {
    let mut review = facts(1, Confidence::None, created_at);
    review.confirmed_reports = 9;
    assert_eq!(quality_v1(&review).score, 0);
}

#[rstest]
fn rating_v2_matches_the_worked_example(created_at: DateTime<Utc>) {
    let reviews = vec![
        facts(5, Confidence::High, created_at),
        facts(5, Confidence::Medium, created_at),
        facts(4, Confidence::None, created_at),
    ];
    let scores: HashMap<UserId, f64> = reviews
        .iter()
        .zip([100.0, 200.0, 50.0])
        .map(|(review, score)| (review.author_id, score))
        .collect();

    let aggregate = rating_v2(&reviews, &scores, Some(4.0))
        .unwrap_or_else(|| panic!("reviews present"));

    assert!((aggregate.base - 4.087).abs() < 1e-3);
    assert!((aggregate.verified_share - 2.0 / 3.0).abs() < 1e-9);
    assert!((aggregate.author_rep_avg_norm - 0.3889).abs() < 1e-3);
    assert!((aggregate.trust - 1.2444).abs() < 1e-3);
    assert_eq!(aggregate.rating, 5.0);
    assert_eq!(aggregate.verified_reviews_count, 2);
}

#[rstest]
fn rating_v2_stays_within_bounds_under_full_fraud(created_at: DateTime<Utc>) {
    let reviews: Vec<_> = (0..4)
        .map(|_| {
            let mut review = facts(1, Confidence::None, created_at);
            review.confirmed_reports = 1;
            review
        })
        .collect();
    let aggregate = rating_v2(&reviews, &HashMap::new(), Some(1.0))
        .unwrap_or_else(|| panic!("reviews present"));
    assert_eq!(aggregate.fraud_risk, 1.0);
    assert_eq!(aggregate.rating, 1.0);
}

#[rstest]
fn rating_v2_defaults_and_clamps_the_global_mean(created_at: DateTime<Utc>) {
    let reviews = vec![facts(3, Confidence::None, created_at)];
    let missing = rating_v2(&reviews, &HashMap::new(), None)
        .unwrap_or_else(|| panic!("reviews present"));
    assert_eq!(missing.global_mean, DEFAULT_GLOBAL_MEAN);
    let clamped = rating_v2(&reviews, &HashMap::new(), Some(9.0))
        .unwrap_or_else(|| panic!("reviews present"));
    assert_eq!(clamped.global_mean, 5.0);
}

#[test]
fn rating_v2_is_undefined_without_reviews() {
    assert!(rating_v2(&[], &HashMap::new(), Some(4.2)).is_none());
}

#[rstest]
fn best_review_prefers_helpfulness_then_quality(created_at: DateTime<Utc>) {
    let mut helpful = facts(3, Confidence::None, created_at);
    helpful.helpful_score = 2.4;
    let mut detailed = facts(5, Confidence::High, created_at);
    detailed.helpful_score = 2.4;
    let quiet = facts(5, Confidence::High, created_at);

    let best = select_best_review(
        &[helpful.clone(), detailed.clone(), quiet],
        &[20, 80, 95],
    )
    .unwrap_or_else(|| panic!("reviews present"));
    assert_eq!(best.review_id, detailed.review_id);
    assert_eq!(best.quality_score, 80);
}

#[rstest]
fn best_review_falls_back_to_recency(created_at: DateTime<Utc>) {
    let older = facts(4, Confidence::Low, created_at);
    let newer = facts(4, Confidence::Low, created_at + Duration::hours(1));
    let best = select_best_review(&[newer.clone(), older], &[50, 50])
        .unwrap_or_else(|| panic!("reviews present"));
    assert_eq!(best.review_id, newer.review_id);
}

#[test]
fn suggestions_are_normalised() {
    let suggested = vec![
        SuggestedTag {
            label: "Уютная атмосфера".to_owned(),
            score: 1.4,
            support_count: 9,
        },
        SuggestedTag {
            label: "уютная  атмосфера".to_owned(),
            score: 0.2,
            support_count: 1,
        },
        SuggestedTag {
            label: "   ".to_owned(),
            score: 0.9,
            support_count: 1,
        },
        SuggestedTag {
            label: "Fast service".to_owned(),
            score: f64::NAN,
            support_count: 2,
        },
    ];
    let tags = normalize_tags(suggested, 4, "gpt-test");
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].key, "уютная_атмосфера");
    assert_eq!(tags[0].score, 1.0);
    assert_eq!(tags[0].support_count, 4);
    assert_eq!(tags[0].kind, "descriptive");
    assert_eq!(tags[1].key, "fast_service");
    assert_eq!(tags[1].score, 0.0);
}

#[test]
fn tag_lists_are_capped() {
    let suggested = (0..10)
        .map(|index| SuggestedTag {
            label: format!("tag {index}"),
            score: 0.5,
            support_count: 1,
        })
        .collect();
    assert_eq!(normalize_tags(suggested, 3, "m").len(), DESCRIPTIVE_TAGS_MAX);
}

#[rstest]
#[case("rating_v2", "quality_v1", 0)]
#[case("rating_v3", "quality_v1", 1)]
#[case("RATING_V3", "quality_v2", 2)]
#[case("rating_v9", "", 1)]
fn version_flags_fall_back(#[case] rating: &str, #[case] quality: &str, #[case] fallbacks: usize) {
    let resolved = FormulaSettings {
        rating_version: rating.to_owned(),
        quality_version: quality.to_owned(),
    }
    .resolve();
    assert_eq!(resolved.rating_version, RATING_V2);
    assert_eq!(resolved.quality_version, QUALITY_V1);
    assert_eq!(resolved.fallbacks.len(), fallbacks);
}

#[test]
fn unknown_versions_are_labelled_as_such() {
    let resolved = FormulaSettings {
        rating_version: "rating_v9".to_owned(),
        quality_version: QUALITY_V1.to_owned(),
    }
    .resolve();
    assert_eq!(resolved.fallbacks[0].reason, "unknown_version");
    assert_eq!(resolved.fallbacks[0].kind, "rating");
}
