//! `quality_v1`: per-review quality score in `0..=100`.

use serde::Serialize;

use super::inputs::ReviewFacts;
use crate::domain::checkins::Confidence;

/// Breakdown kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityBreakdown {
    pub drink: f64,
    pub tags: f64,
    pub text: f64,
    pub photo: f64,
    pub visit: f64,
    pub base: f64,
    pub score: u8,
}

fn text_factor(summary_length: u32) -> f64 {
    match summary_length {
        0..60 => 0.0,
        60..100 => 0.4,
        100..180 => 0.7,
        _ => 1.0,
    }
}

fn visit_factor(confidence: Confidence) -> f64 {
    match confidence {
        Confidence::None => 0.0,
        Confidence::Low => 0.4,
        Confidence::Medium => 0.7,
        Confidence::High => 1.0,
    }
}

/// Score one review.
///
/// A non-empty drink name counts even when it never resolved to a
/// catalogue entry.
#[must_use]
pub fn quality_v1(review: &ReviewFacts) -> QualityBreakdown {
    let drink = if review.drink_name.trim().is_empty() { 0.0 } else { 1.0 };
    let tags = f64::from(review.tags_count.min(5)) / 5.0;
    let text = text_factor(review.summary_length);
    let photo = f64::from(review.photo_count.min(3)) / 3.0;
    let visit = visit_factor(review.confidence);
    let base = 100.0 * (0.20 * drink + 0.20 * tags + 0.25 * text + 0.20 * photo + 0.15 * visit);
    let penalised = (base - 20.0 * f64::from(review.confirmed_reports)).round();
    let clamped = penalised.clamp(0.0, 100.0);
    QualityBreakdown {
        drink,
        tags,
        text,
        photo,
        visit,
        base,
        // Clamped to 0..=100 above.
        score: clamped as u8,
    }
}
