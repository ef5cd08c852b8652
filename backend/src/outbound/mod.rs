//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed stores and repositories using Diesel
//! - **object_store**: signed-URL HTTP object store for review photos
//! - **photo_codec**: image decoding, resizing and re-encoding
//! - **summarizer**: OpenAI-compatible client for descriptive café tags
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod object_store;
pub mod persistence;
pub mod photo_codec;
pub mod summarizer;
