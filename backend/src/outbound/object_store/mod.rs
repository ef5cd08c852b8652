//! Object store outbound adapter.
//!
//! A reqwest client for a bucket-per-path HTTP object store that accepts
//! HMAC-signed URLs. The same signing scheme authorises presigned client
//! uploads and the backend's own `HEAD`/`GET`/`PUT`/`DELETE` calls.

mod http_store;
mod signing;

pub use http_store::{HttpObjectStore, ObjectStoreSettings};
