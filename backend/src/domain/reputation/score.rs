//! Score derivation from the ledger: daily caps, age decay, clamp.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::model::{ReputationEvent, ReputationEventType};

/// Upper bound of a reputation score.
pub const SCORE_MAX: f64 = 1000.0;

/// Multiplier applied to an event by age.
///
/// # Examples
/// ```
/// use backend::domain::reputation::decay_factor;
///
/// assert_eq!(decay_factor(50), 1.0);
/// assert_eq!(decay_factor(120), 0.7);
/// assert_eq!(decay_factor(300), 0.4);
/// assert_eq!(decay_factor(400), 0.2);
/// ```
#[must_use]
pub fn decay_factor(age_days: i64) -> f64 {
    match age_days {
        ..=90 => 1.0,
        91..=180 => 0.7,
        181..=365 => 0.4,
        _ => 0.2,
    }
}

/// Derive a user's score at `now`.
///
/// Capped event types are grouped per UTC day; when a day's raw sum
/// exceeds its cap, every event of that day is scaled down so the day
/// contributes exactly the cap before decay.
#[must_use]
pub fn compute_score(events: &[ReputationEvent], now: DateTime<Utc>) -> f64 {
    let mut daily_totals: HashMap<(ReputationEventType, NaiveDate), f64> = HashMap::new();
    for event in events {
        if event.event_type.daily_cap().is_some() && event.points > 0 {
            *daily_totals
                .entry((event.event_type, event.created_at.date_naive()))
                .or_insert(0.0) += f64::from(event.points);
        }
    }

    let total: f64 = events
        .iter()
        .map(|event| {
            let raw = f64::from(event.points);
            let cap_factor = match event.event_type.daily_cap() {
                Some(cap) if event.points > 0 => daily_totals
                    .get(&(event.event_type, event.created_at.date_naive()))
                    .filter(|sum| **sum > cap)
                    .map_or(1.0, |sum| cap / sum),
                _ => 1.0,
            };
            let age_days = (now - event.created_at).num_days();
            raw * cap_factor * decay_factor(age_days)
        })
        .sum();
    total.clamp(0.0, SCORE_MAX)
}
