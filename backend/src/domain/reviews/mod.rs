//! Reviews: validation, the write path and the read feed.

mod fingerprint;
mod listing;
mod model;
mod service;
mod validation;

pub use fingerprint::summary_fingerprint;
pub use listing::{ReviewFeed, ReviewListItem, ReviewSort};
pub use model::{
    Review, ReviewAttributes, ReviewStatus, StarRating, StarRatingOutOfRange, UnknownReviewStatus,
};
pub use service::{
    RemoveReviewRequest, ReviewRemovedResponse, ReviewWriteResponse, ReviewsService,
};
pub use validation::{
    DRINK_NAME_MAX_CHARS, DrinkInput, PHOTOS_MAX, PublishReviewRequest, SUMMARY_MAX_CHARS,
    SUMMARY_MIN_CHARS, TASTE_TAG_MAX_CHARS, TASTE_TAGS_MAX, UpdateReviewRequest, ValidatedReview,
    merge_update, normalize_taste_tags, validate_review,
};
