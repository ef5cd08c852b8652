//! Badge labels by score.

use serde::Serialize;

/// Score from which a user counts as a trusted participant.
pub const TRUSTED_THRESHOLD: f64 = 120.0;

/// Level tiers in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationTier {
    Participant,
    Active,
    Trusted,
    Verified,
    Expert,
    Ambassador,
    Legend,
}

const THRESHOLDS: [(f64, ReputationTier); 7] = [
    (900.0, ReputationTier::Legend),
    (700.0, ReputationTier::Ambassador),
    (450.0, ReputationTier::Expert),
    (250.0, ReputationTier::Verified),
    (TRUSTED_THRESHOLD, ReputationTier::Trusted),
    (40.0, ReputationTier::Active),
    (0.0, ReputationTier::Participant),
];

impl ReputationTier {
    /// Highest tier whose threshold `score` reaches.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::reputation::ReputationTier;
    ///
    /// assert_eq!(ReputationTier::for_score(119.9), ReputationTier::Active);
    /// assert_eq!(ReputationTier::for_score(120.0), ReputationTier::Trusted);
    /// assert_eq!(ReputationTier::for_score(120.0).label(), "Надёжный");
    /// ```
    #[must_use]
    pub fn for_score(score: f64) -> Self {
        THRESHOLDS
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map_or(Self::Participant, |(_, tier)| *tier)
    }

    /// Public badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Participant => "Участник",
            Self::Active => "Активный",
            Self::Trusted => "Надёжный",
            Self::Verified => "Проверенный",
            Self::Expert => "Эксперт",
            Self::Ambassador => "Амбассадор",
            Self::Legend => "Легенда",
        }
    }

    /// Whether the tier passes the trusted-participant gate.
    #[must_use]
    pub fn is_trusted(self) -> bool {
        self >= Self::Trusted
    }
}
