//! In-process token buckets keyed by user.
//!
//! Buckets live in memory only; a restart refills everyone. Limits protect
//! the write path from bursts, not from a determined attacker.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Error, UserId};

/// Capacity and refill rate of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBucketConfig {
    /// Tokens available to a fresh user.
    pub burst: u32,
    /// Time to regain one token.
    pub refill_every: Duration,
}

impl TokenBucketConfig {
    /// Review creation: three at once, then one every two minutes.
    pub const REVIEW_CREATE: Self = Self {
        burst: 3,
        refill_every: Duration::from_secs(120),
    };

    /// Review edits: ten at once, then one every thirty seconds.
    pub const REVIEW_UPDATE: Self = Self {
        burst: 10,
        refill_every: Duration::from_secs(30),
    };
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: DateTime<Utc>,
}

impl Bucket {
    fn refill(&mut self, now: DateTime<Utc>, burst: f64, refill_secs: f64) {
        let elapsed = (now - self.refilled_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        self.tokens = (self.tokens + elapsed / refill_secs).min(burst);
        self.refilled_at = now;
    }

    fn is_full_at(&self, now: DateTime<Utc>, burst: f64, refill_secs: f64) -> bool {
        let mut projected = *self;
        projected.refill(now, burst, refill_secs);
        projected.tokens >= burst
    }
}

#[derive(Debug)]
struct Buckets {
    by_user: HashMap<UserId, Bucket>,
    pruned_at: Option<DateTime<Utc>>,
}

/// Per-user token bucket.
///
/// A bucket that has refilled to `burst` is indistinguishable from a fresh
/// one, so such entries are swept at most once per full refill window.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    config: TokenBucketConfig,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(name: &'static str, config: TokenBucketConfig) -> Self {
        Self {
            name,
            config,
            buckets: Mutex::new(Buckets {
                by_user: HashMap::new(),
                pruned_at: None,
            }),
        }
    }

    /// Take one token for `user_id`, or fail with `too_many_requests`.
    pub fn acquire(&self, user_id: UserId, now: DateTime<Utc>) -> Result<(), Error> {
        let burst = f64::from(self.config.burst);
        let refill_secs = self.config.refill_every.as_secs_f64().max(f64::EPSILON);
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| Error::internal("rate limiter state poisoned"))?;
        self.prune(&mut buckets, now, burst, refill_secs);

        let bucket = buckets.by_user.entry(user_id).or_insert(Bucket {
            tokens: burst,
            refilled_at: now,
        });
        bucket.refill(now, burst, refill_secs);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }
        let retry_after = ((1.0 - bucket.tokens) * refill_secs).ceil();
        Err(
            Error::too_many_requests(format!("too many {} requests", self.name))
                .with_details(json!({ "retry_after_seconds": retry_after })),
        )
    }

    /// Users currently holding a partially drained bucket.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.buckets
            .lock()
            .map_or(0, |buckets| buckets.by_user.len())
    }

    fn prune(&self, buckets: &mut Buckets, now: DateTime<Utc>, burst: f64, refill_secs: f64) {
        let window = self
            .config
            .refill_every
            .saturating_mul(self.config.burst.max(1));
        let due = buckets.pruned_at.is_none_or(|at| {
            (now - at).to_std().unwrap_or(Duration::ZERO) >= window
        });
        if !due {
            return;
        }
        buckets
            .by_user
            .retain(|_, bucket| !bucket.is_full_at(now, burst, refill_secs));
        buckets.pruned_at = Some(now);
    }
}

/// The two limiters guarding review writes.
#[derive(Debug)]
pub struct ReviewRateLimits {
    pub create: RateLimiter,
    pub update: RateLimiter,
}

impl ReviewRateLimits {
    #[must_use]
    pub fn new(create: TokenBucketConfig, update: TokenBucketConfig) -> Self {
        Self {
            create: RateLimiter::new("review create", create),
            update: RateLimiter::new("review update", update),
        }
    }
}

impl Default for ReviewRateLimits {
    fn default() -> Self {
        Self::new(TokenBucketConfig::REVIEW_CREATE, TokenBucketConfig::REVIEW_UPDATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use chrono::TimeDelta;
    use rstest::rstest;

    fn limiter(burst: u32, refill_secs: u64) -> RateLimiter {
        RateLimiter::new(
            "test",
            TokenBucketConfig {
                burst,
                refill_every: Duration::from_secs(refill_secs),
            },
        )
    }

    #[rstest]
    fn burst_is_available_immediately() {
        let limiter = limiter(3, 60);
        let user = UserId::random();
        let now = Utc::now();
        for _ in 0..3 {
            limiter.acquire(user, now).expect("token available");
        }
        let err = limiter.acquire(user, now).expect_err("bucket empty");
        assert_eq!(err.code(), ErrorCode::TooManyRequests);
        assert_eq!(
            err.details().and_then(|d| d.get("retry_after_seconds")),
            Some(&json!(60.0))
        );
    }

    #[rstest]
    fn tokens_refill_over_time() {
        let limiter = limiter(1, 30);
        let user = UserId::random();
        let start = Utc::now();
        limiter.acquire(user, start).expect("first token");
        assert!(limiter.acquire(user, start + TimeDelta::seconds(10)).is_err());
        limiter
            .acquire(user, start + TimeDelta::seconds(41))
            .expect("refilled token");
    }

    #[rstest]
    fn refilled_buckets_are_forgotten() {
        let limiter = limiter(2, 60);
        let start = Utc::now();
        for _ in 0..5 {
            limiter.acquire(UserId::random(), start).expect("fresh user");
        }
        assert_eq!(limiter.tracked_users(), 5);

        let later = start + TimeDelta::seconds(121);
        let active = UserId::random();
        limiter.acquire(active, later).expect("new user");

        assert_eq!(limiter.tracked_users(), 1);
        limiter.acquire(active, later).expect("second token kept");
        assert!(limiter.acquire(active, later).is_err());
    }

    #[rstest]
    fn partially_drained_buckets_survive_a_sweep() {
        let limiter = limiter(1, 60);
        let start = Utc::now();
        let early = UserId::random();
        let recent = UserId::random();
        limiter.acquire(early, start).expect("early token");
        limiter
            .acquire(recent, start + TimeDelta::seconds(30))
            .expect("recent token");

        limiter
            .acquire(UserId::random(), start + TimeDelta::seconds(61))
            .expect("sweeping call");

        assert_eq!(limiter.tracked_users(), 2);
        assert!(limiter.acquire(recent, start + TimeDelta::seconds(61)).is_err());
        assert!(limiter.acquire(early, start + TimeDelta::seconds(61)).is_ok());
    }

    #[rstest]
    fn users_have_independent_buckets() {
        let limiter = limiter(1, 600);
        let now = Utc::now();
        limiter.acquire(UserId::random(), now).expect("first user");
        limiter.acquire(UserId::random(), now).expect("second user");
    }
}
