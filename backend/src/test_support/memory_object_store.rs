//! Object store kept in a map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{ObjectHead, ObjectStore, ObjectStoreError, PresignedUpload};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Objects addressed by key, served from `https://cdn.test/`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub const PUBLIC_BASE: &'static str = "https://cdn.test";

    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        match self.objects.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("object store mutex"),
        }
    }

    /// Place an object as a client upload would.
    pub fn insert(&self, key: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects().insert(
            key.to_owned(),
            StoredObject {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects()
            .get(key)
            .map(|object| object.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PresignedUpload, ObjectStoreError> {
        Ok(PresignedUpload {
            url: format!("https://objects.test/{key}?expires={}", expires_at.timestamp()),
            method: "PUT".to_owned(),
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            expires_at,
        })
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, ObjectStoreError> {
        Ok(self.objects().get(key).map(|object| ObjectHead {
            size_bytes: i64::try_from(object.bytes.len()).unwrap_or(i64::MAX),
            content_type: Some(object.content_type.clone()),
        }))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects()
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| ObjectStoreError::not_found(key))
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.insert(key, bytes, content_type);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!("{}/{key}", Self::PUBLIC_BASE))
    }
}
