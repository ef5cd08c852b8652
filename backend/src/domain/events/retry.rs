//! Retry, lease and dead-letter policy for event dispatch.

use chrono::{DateTime, Duration, Utc};

/// Knobs shared by the outbox and inbox dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after which an inbox row is failed and dead-lettered.
    pub max_attempts: i32,
    /// Exponent cap for the `2^attempts` backoff.
    pub max_exponent: u32,
    /// Absolute backoff cap.
    pub max_backoff: Duration,
    /// Age after which a `processing` lease is considered stuck.
    pub stuck_lease: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            max_exponent: 8,
            max_backoff: Duration::seconds(300),
            stuck_lease: Duration::minutes(5),
        }
    }
}

/// What to do with a row whose handler just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Back to `pending`, claimable again at `available_at`.
    Retry {
        attempts: i32,
        available_at: DateTime<Utc>,
    },
    /// Mark `failed` and upsert into the DLQ.
    DeadLetter { attempts: i32 },
}

impl RetryPolicy {
    /// Delay before the next attempt, given attempts made so far.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::events::RetryPolicy;
    /// use chrono::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff(1), Duration::seconds(2));
    /// assert_eq!(policy.backoff(2), Duration::seconds(4));
    /// assert_eq!(policy.backoff(15), Duration::seconds(256));
    /// ```
    #[must_use]
    pub fn backoff(&self, attempts: i32) -> Duration {
        let exponent = u32::try_from(attempts.max(0))
            .unwrap_or(0)
            .min(self.max_exponent);
        let seconds = 2_i64.saturating_pow(exponent);
        Duration::seconds(seconds).min(self.max_backoff)
    }

    /// Leases older than this are reclaimable.
    #[must_use]
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.stuck_lease
    }

    /// Decide the next state after a failed attempt.
    ///
    /// `attempts` is the row's counter, which the claim already bumped for
    /// the attempt that just failed.
    #[must_use]
    pub fn on_failure(&self, attempts: i32, now: DateTime<Utc>) -> FailureDisposition {
        if attempts >= self.max_attempts {
            FailureDisposition::DeadLetter { attempts }
        } else {
            FailureDisposition::Retry {
                attempts,
                available_at: now + self.backoff(attempts),
            }
        }
    }
}

/// Truncate handler errors before storing them on a row.
#[must_use]
pub fn truncate_error(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
