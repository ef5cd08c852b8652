//! Geofence, dwell, cooldown and travel-speed rules.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use super::geo::GeoPoint;
use super::model::{CheckIn, Confidence};
use crate::domain::{CafeId, Error};

/// Thresholds applied when starting and verifying check-ins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckInPolicy {
    pub radius_m: f64,
    pub min_dwell: Duration,
    pub cross_cafe_cooldown: Duration,
    pub max_speed_kmh: f64,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            radius_m: 150.0,
            min_dwell: Duration::minutes(5),
            cross_cafe_cooldown: Duration::minutes(5),
            max_speed_kmh: 220.0,
        }
    }
}

/// Risk markers recorded on a check-in row.
pub mod risk_flags {
    pub const ADMIN_DISTANCE_BYPASS: &str = "admin_distance_bypass";
    pub const ADMIN_COOLDOWN_BYPASS: &str = "admin_cooldown_bypass";
    pub const ADMIN_SPEED_BYPASS: &str = "admin_speed_bypass";
    pub const ADMIN_DWELL_BYPASS: &str = "admin_dwell_bypass";
    pub const VERIFY_OUTSIDE_GEOFENCE: &str = "verify_outside_geofence";
}

impl CheckInPolicy {
    /// Geofence check at start. Admins pass with a risk flag.
    pub fn check_distance(
        &self,
        distance_m: f64,
        is_admin: bool,
        flags: &mut Vec<String>,
    ) -> Result<(), Error> {
        if distance_m <= self.radius_m {
            return Ok(());
        }
        if is_admin {
            flags.push(risk_flags::ADMIN_DISTANCE_BYPASS.to_owned());
            return Ok(());
        }
        Err(Error::check_in_too_far("you are too far from the café to check in")
            .with_details(json!({
                "distance_m": distance_m.round(),
                "max_distance_m": self.radius_m,
            })))
    }

    /// Cooldown and impossible-travel guards against the previous check-in.
    pub fn check_previous(
        &self,
        previous: Option<&CheckIn>,
        cafe_id: CafeId,
        point: &GeoPoint,
        now: DateTime<Utc>,
        is_admin: bool,
        flags: &mut Vec<String>,
    ) -> Result<(), Error> {
        let Some(previous) = previous else {
            return Ok(());
        };
        let elapsed = now - previous.started_at;
        if previous.cafe_id != cafe_id && elapsed < self.cross_cafe_cooldown {
            if is_admin {
                flags.push(risk_flags::ADMIN_COOLDOWN_BYPASS.to_owned());
            } else {
                let retry_after = (self.cross_cafe_cooldown - elapsed).num_seconds().max(1);
                return Err(Error::check_in_cooldown(
                    "another check-in started too recently",
                )
                .with_details(json!({ "retry_after_seconds": retry_after })));
            }
        }
        let distance_m = previous.start.distance_m(point);
        if self.exceeds_speed(distance_m, elapsed) {
            if is_admin {
                flags.push(risk_flags::ADMIN_SPEED_BYPASS.to_owned());
            } else {
                return Err(Error::check_in_suspicious(
                    "travel between check-ins is implausibly fast",
                )
                .with_details(json!({ "distance_m": distance_m.round() })));
            }
        }
        Ok(())
    }

    /// True when covering `distance_m` in `elapsed` beats the speed limit.
    #[must_use]
    pub fn exceeds_speed(&self, distance_m: f64, elapsed: Duration) -> bool {
        if distance_m <= self.radius_m {
            return false;
        }
        let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
        if seconds <= 0.0 {
            return true;
        }
        let speed_kmh = (distance_m / 1000.0) / (seconds / 3600.0);
        speed_kmh > self.max_speed_kmh
    }

    /// Earliest moment a started check-in may be verified.
    #[must_use]
    pub fn can_verify_after(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + self.min_dwell
    }
}

/// Confidence for a verify attempt.
///
/// # Examples
/// ```
/// use backend::domain::checkins::{Confidence, classify_confidence};
/// use chrono::Duration;
///
/// assert_eq!(classify_confidence(Duration::minutes(11), 40.0, false), Confidence::High);
/// assert_eq!(classify_confidence(Duration::minutes(6), 40.0, true), Confidence::Medium);
/// ```
#[must_use]
pub fn classify_confidence(dwell: Duration, distance_m: f64, is_admin: bool) -> Confidence {
    let seconds = dwell.num_seconds();
    let computed = if seconds >= 10 * 60 && distance_m <= 150.0 {
        Confidence::High
    } else if seconds >= 7 * 60 && distance_m <= 200.0 {
        Confidence::Medium
    } else if seconds >= 5 * 60 && distance_m <= 300.0 {
        Confidence::Low
    } else {
        Confidence::None
    };
    if is_admin {
        computed.max(Confidence::Medium)
    } else {
        computed
    }
}
