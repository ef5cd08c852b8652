//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Write paths go through [`ReviewsStore`], which hands services a
//! transaction handle ([`ReviewsTx`]) so business rows, idempotency slots and
//! outbox rows commit together. Background workers use the narrower
//! repositories below.

mod macros;
pub(crate) use macros::define_port_error;

mod event_store;
mod object_store;
mod photo_codec;
mod photo_upload_repository;
mod rating_repository;
mod reputation_repository;
mod review_commands;
mod review_query;
mod review_summarizer;
mod reviews_store;
mod store_error;
pub mod tx;

#[cfg(test)]
pub use event_store::MockEventStore;
pub use event_store::{DlqQuery, EventStore};
#[cfg(test)]
pub use object_store::MockObjectStore;
pub use object_store::{
    DisabledObjectStore, ObjectHead, ObjectStore, ObjectStoreError, PresignedUpload,
};
#[cfg(test)]
pub use photo_codec::MockPhotoCodec;
pub use photo_codec::{PhotoCodec, PhotoCodecError};
#[cfg(test)]
pub use photo_upload_repository::MockPhotoUploadRepository;
pub use photo_upload_repository::{PhotoUploadRepository, ReadyPhoto};
#[cfg(test)]
pub use rating_repository::MockRatingRepository;
pub use rating_repository::RatingRepository;
#[cfg(test)]
pub use reputation_repository::MockReputationRepository;
pub use reputation_repository::ReputationRepository;
#[cfg(test)]
pub use review_commands::{
    MockCheckInCommand, MockEngagementCommand, MockPhotoCommand, MockReviewFeedQuery,
    MockReviewsCommand,
};
pub use review_commands::{
    CheckInCommand, EngagementCommand, PhotoCommand, ReviewFeedQuery, ReviewsCommand,
};
#[cfg(test)]
pub use review_query::MockReviewQuery;
pub use review_query::ReviewQuery;
#[cfg(test)]
pub use review_summarizer::MockReviewSummarizer;
pub use review_summarizer::{DisabledSummarizer, ReviewSummarizer, SummarizerError};
pub use reviews_store::{ReviewsStore, ReviewsTx, TxFuture, UnitOfWork, unit_of_work};
pub use store_error::StoreError;
