//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain ports backed by PostgreSQL via
//! `diesel-async` with `bb8` pooling.
//!
//! - Row structs (`models`) and table definitions (`schema`) stay private to
//!   this module; adapters translate them into domain types.
//! - [`DieselReviewsStore`] runs service units of work inside one database
//!   transaction. The other adapters issue single statements or short
//!   transactions of their own.
//! - Database errors are mapped to `StoreError` in `diesel_helpers`.
//!
//! # Example
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselReviewsStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/gde_kofe")).await?;
//! let store = DieselReviewsStore::new(pool.clone());
//! ```

pub(crate) mod diesel_helpers;
mod diesel_event_store;
mod diesel_photo_upload_repository;
mod diesel_rating_repository;
mod diesel_reputation_repository;
mod diesel_review_query;
mod diesel_reviews_store;
mod models;
mod pool;
mod schema;

pub use diesel_event_store::DieselEventStore;
pub use diesel_photo_upload_repository::DieselPhotoUploadRepository;
pub use diesel_rating_repository::DieselRatingRepository;
pub use diesel_reputation_repository::DieselReputationRepository;
pub use diesel_review_query::DieselReviewQuery;
pub use diesel_reviews_store::DieselReviewsStore;
pub use pool::{DbPool, PoolConfig, PoolError};
