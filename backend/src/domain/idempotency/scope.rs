//! Idempotency scopes: which mutation a key belongs to, and for whom.

use std::fmt;

use crate::domain::UserId;

/// Mutations that run inside the idempotency envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    ReviewPublish,
    ReviewUpdate,
    ReviewRemove,
    CheckInStart,
    CheckInVerify,
    VoteHelpful,
    AbuseReport,
    AbuseConfirm,
    PhotoConfirm,
}

impl ScopeKind {
    /// Every scope kind, for exhaustive tests.
    pub const ALL: [Self; 9] = [
        Self::ReviewPublish,
        Self::ReviewUpdate,
        Self::ReviewRemove,
        Self::CheckInStart,
        Self::CheckInVerify,
        Self::VoteHelpful,
        Self::AbuseReport,
        Self::AbuseConfirm,
        Self::PhotoConfirm,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReviewPublish => "review.publish",
            Self::ReviewUpdate => "review.update",
            Self::ReviewRemove => "review.remove",
            Self::CheckInStart => "checkin.start",
            Self::CheckInVerify => "checkin.verify",
            Self::VoteHelpful => "vote.helpful",
            Self::AbuseReport => "abuse.report",
            Self::AbuseConfirm => "abuse.confirm",
            Self::PhotoConfirm => "photo.confirm",
        }
    }
}

/// Fully qualified scope string, e.g. `review.publish:<user>`.
///
/// # Examples
/// ```
/// use backend::domain::UserId;
/// use backend::domain::idempotency::{IdempotencyScope, ScopeKind};
///
/// let user = UserId::random();
/// let scope = IdempotencyScope::new(ScopeKind::VoteHelpful, user);
/// assert_eq!(scope.as_str(), format!("vote.helpful:{user}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyScope(String);

impl IdempotencyScope {
    #[must_use]
    pub fn new(kind: ScopeKind, user_id: UserId) -> Self {
        Self(format!("{}:{user_id}", kind.as_str()))
    }

    /// Rebuild a scope read back from storage.
    #[must_use]
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
