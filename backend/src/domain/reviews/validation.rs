//! Input validation and normalisation for review writes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::fingerprint::summary_fingerprint;
use super::model::StarRating;
use crate::domain::{CafeId, DrinkId, Error};

/// Minimum summary length in Unicode scalar values, after trimming.
pub const SUMMARY_MIN_CHARS: usize = 60;
pub const SUMMARY_MAX_CHARS: usize = 4000;
pub const TASTE_TAGS_MAX: usize = 10;
pub const TASTE_TAG_MAX_CHARS: usize = 40;
pub const PHOTOS_MAX: usize = 10;
pub const DRINK_NAME_MAX_CHARS: usize = 120;

/// Body of `POST /reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReviewRequest {
    pub cafe_id: CafeId,
    pub rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_id: Option<DrinkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_name: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub taste_tags: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Body of `PATCH /reviews/{id}`; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_id: Option<DrinkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taste_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
}

impl UpdateReviewRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Drink as supplied by the client, before catalogue resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrinkInput {
    pub drink_id: Option<DrinkId>,
    pub drink_name: Option<String>,
}

/// A review write that passed every shape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReview {
    pub cafe_id: CafeId,
    pub rating: StarRating,
    pub drink: DrinkInput,
    pub summary: String,
    pub summary_length: u32,
    pub summary_fingerprint: String,
    pub taste_tags: Vec<String>,
    pub photos: Vec<String>,
}

fn field_error(field: &str, message: impl Into<String>) -> Error {
    Error::invalid_argument(message).with_details(json!({ "field": field }))
}

/// Validate a full review body.
pub fn validate_review(request: &PublishReviewRequest) -> Result<ValidatedReview, Error> {
    let rating = StarRating::new(request.rating).map_err(|err| field_error("rating", err.to_string()))?;
    let drink = validate_drink(request.drink_id, request.drink_name.as_deref())?;
    let summary = request.summary.trim().to_owned();
    let length = summary.chars().count();
    if length < SUMMARY_MIN_CHARS {
        return Err(field_error(
            "summary",
            format!("summary must be at least {SUMMARY_MIN_CHARS} characters"),
        ));
    }
    if length > SUMMARY_MAX_CHARS {
        return Err(field_error(
            "summary",
            format!("summary must be at most {SUMMARY_MAX_CHARS} characters"),
        ));
    }
    let summary_length =
        u32::try_from(length).map_err(|_| field_error("summary", "summary is too long"))?;
    Ok(ValidatedReview {
        cafe_id: request.cafe_id,
        rating,
        drink,
        summary_fingerprint: summary_fingerprint(&summary),
        summary,
        summary_length,
        taste_tags: normalize_taste_tags(&request.taste_tags)?,
        photos: validate_photos(&request.photos)?,
    })
}

fn validate_drink(drink_id: Option<DrinkId>, drink_name: Option<&str>) -> Result<DrinkInput, Error> {
    let drink_name = drink_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);
    if drink_id.is_none() && drink_name.is_none() {
        return Err(field_error("drink", "drink_id or drink_name is required"));
    }
    if drink_name
        .as_ref()
        .is_some_and(|name| name.chars().count() > DRINK_NAME_MAX_CHARS)
    {
        return Err(field_error(
            "drink_name",
            format!("drink_name must be at most {DRINK_NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(DrinkInput {
        drink_id,
        drink_name,
    })
}

/// Lowercase, drop blanks and duplicates, keep the first ten, then sort.
pub fn normalize_taste_tags(tags: &[String]) -> Result<Vec<String>, Error> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        if tag.chars().count() > TASTE_TAG_MAX_CHARS {
            return Err(field_error(
                "taste_tags",
                format!("taste tags must be at most {TASTE_TAG_MAX_CHARS} characters"),
            ));
        }
        normalized.push(tag);
    }
    normalized.truncate(TASTE_TAGS_MAX);
    normalized.sort();
    Ok(normalized)
}

fn validate_photos(photos: &[String]) -> Result<Vec<String>, Error> {
    if photos.len() > PHOTOS_MAX {
        return Err(field_error(
            "photos",
            format!("at most {PHOTOS_MAX} photos are allowed"),
        ));
    }
    photos
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let raw = raw.trim();
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
                _ => Err(Error::invalid_argument("photos must be valid http(s) URLs")
                    .with_details(json!({ "field": "photos", "index": index }))),
            }
        })
        .collect()
}

/// Overlay a partial update onto the stored review body.
#[must_use]
pub fn merge_update(current: PublishReviewRequest, patch: &UpdateReviewRequest) -> PublishReviewRequest {
    let drink_changed = patch.drink_id.is_some() || patch.drink_name.is_some();
    PublishReviewRequest {
        cafe_id: current.cafe_id,
        rating: patch.rating.unwrap_or(current.rating),
        drink_id: if drink_changed { patch.drink_id } else { current.drink_id },
        drink_name: if drink_changed {
            patch.drink_name.clone()
        } else {
            current.drink_name
        },
        summary: patch.summary.clone().unwrap_or(current.summary),
        taste_tags: patch.taste_tags.clone().unwrap_or(current.taste_tags),
        photos: patch.photos.clone().unwrap_or(current.photos),
    }
}
