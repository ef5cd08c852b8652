//! Descriptive tags produced by the optional text summariser.

use serde::{Deserialize, Serialize};

/// Minimum published reviews before the summariser is consulted.
pub const DESCRIPTIVE_TAGS_MIN_REVIEWS: usize = 3;
/// Upper bound on tags stored per snapshot.
pub const DESCRIPTIVE_TAGS_MAX: usize = 6;

/// One tag as stored in `components.descriptive_tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveTag {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub score: f64,
    pub support_count: u32,
    pub source: String,
}

/// Tag as returned by a summariser, before normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedTag {
    pub label: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub support_count: u32,
}

/// Slug used as the tag key: lowercase words joined by underscores.
///
/// # Examples
/// ```
/// use backend::domain::rating::tag_key;
///
/// assert_eq!(tag_key("  Cosy  Atmosphere!"), "cosy_atmosphere");
/// ```
#[must_use]
pub fn tag_key(label: &str) -> String {
    label
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalise suggestions: drop blanks and duplicates, clamp scores, cap
/// support at the number of reviews, keep the strongest few.
#[must_use]
pub fn normalize_tags(suggested: Vec<SuggestedTag>, review_count: usize, source: &str) -> Vec<DescriptiveTag> {
    let max_support = u32::try_from(review_count).unwrap_or(u32::MAX);
    let mut tags: Vec<DescriptiveTag> = Vec::new();
    for tag in suggested {
        let label = tag.label.trim().to_owned();
        let key = tag_key(&label);
        if key.is_empty() || tags.iter().any(|existing| existing.key == key) {
            continue;
        }
        let score = if tag.score.is_finite() { tag.score.clamp(0.0, 1.0) } else { 0.0 };
        tags.push(DescriptiveTag {
            key,
            label,
            kind: "descriptive".to_owned(),
            score,
            support_count: tag.support_count.min(max_support),
            source: source.to_owned(),
        });
    }
    tags.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    tags.truncate(DESCRIPTIVE_TAGS_MAX);
    tags
}
