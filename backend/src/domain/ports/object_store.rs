//! Object store used for review photos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;

define_port_error! {
    /// Errors raised by object store adapters.
    pub enum ObjectStoreError {
        /// No object store is configured.
        Disabled => service_unavailable, "object store is disabled",
        /// The object does not exist.
        NotFound { key: String } => not_found, "object {key} not found",
        /// The store could not be reached.
        Transport { message: String } => service_unavailable, "object store unreachable: {message}",
        /// The store answered with an error status.
        Rejected { status: u16, message: String } => internal, "object store rejected request ({status}): {message}",
    }
}

/// URL and headers a client uses to upload directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub expires_at: DateTime<Utc>,
}

/// Metadata returned by `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size_bytes: i64,
    pub content_type: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PresignedUpload, ObjectStoreError>;

    /// `None` when the object does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<(), ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Public URL of a stored object, when the store exposes one.
    fn public_url(&self, key: &str) -> Option<String>;
}

/// Object store used when none is configured; every call is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledObjectStore;

#[async_trait]
impl ObjectStore for DisabledObjectStore {
    async fn presign_put(
        &self,
        _key: &str,
        _content_type: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<PresignedUpload, ObjectStoreError> {
        Err(ObjectStoreError::disabled())
    }

    async fn head(&self, _key: &str) -> Result<Option<ObjectHead>, ObjectStoreError> {
        Err(ObjectStoreError::disabled())
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        Err(ObjectStoreError::disabled())
    }

    async fn put(
        &self,
        _key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::disabled())
    }

    async fn delete(&self, _key: &str) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::disabled())
    }

    fn public_url(&self, _key: &str) -> Option<String> {
        None
    }
}
