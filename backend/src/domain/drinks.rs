//! Drink catalogue lookups used while publishing a review.

use chrono::{DateTime, Utc};

use super::DrinkId;

/// Active or retired catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: DrinkId,
    pub name: String,
    pub aliases: Vec<String>,
    pub popularity_rank: i32,
    pub is_active: bool,
}

impl Drink {
    /// Case-insensitive match on the name or any alias.
    #[must_use]
    pub fn matches_name(&self, canonical: &str) -> bool {
        canonicalize_drink_name(&self.name) == canonical
            || self
                .aliases
                .iter()
                .any(|alias| canonicalize_drink_name(alias) == canonical)
    }
}

/// Review of an unknown drink string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownDrinkStatus {
    New,
    Mapped,
    Ignored,
}

impl UnknownDrinkStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Mapped => "mapped",
            Self::Ignored => "ignored",
        }
    }
}

/// Free-form drink text that matched nothing in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDrinkFormat {
    pub name: String,
    pub mentions_count: i32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_user_id: Option<super::UserId>,
    pub status: UnknownDrinkStatus,
    pub mapped_drink_id: Option<DrinkId>,
}

impl UnknownDrinkFormat {
    /// Apply one more mention; ignored entries go back to triage.
    pub fn record_mention(&mut self, user_id: super::UserId, now: DateTime<Utc>) {
        self.mentions_count = self.mentions_count.saturating_add(1);
        self.last_seen_at = now;
        self.last_user_id = Some(user_id);
        if self.status == UnknownDrinkStatus::Ignored {
            self.status = UnknownDrinkStatus::New;
        }
    }
}

/// Outcome of catalogue resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrinkResolution {
    /// Matched an active catalogue row.
    Catalogue(Drink),
    /// Recorded as an unknown format; the review keeps the user's text.
    Unknown { display_name: String, canonical: String },
}

impl DrinkResolution {
    #[must_use]
    pub fn drink_id(&self) -> Option<DrinkId> {
        match self {
            Self::Catalogue(drink) => Some(drink.id),
            Self::Unknown { .. } => None,
        }
    }

    #[must_use]
    pub fn drink_name(&self) -> &str {
        match self {
            Self::Catalogue(drink) => &drink.name,
            Self::Unknown { display_name, .. } => display_name,
        }
    }
}

/// Trim, lowercase and collapse internal whitespace.
///
/// # Examples
/// ```
/// use backend::domain::drinks::canonicalize_drink_name;
///
/// assert_eq!(canonicalize_drink_name("  Flat   White "), "flat white");
/// ```
#[must_use]
pub fn canonicalize_drink_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
