//! Reqwest-backed object store adapter.
//!
//! Objects live at `<endpoint>/<bucket>/<key>`. Every request URL carries an
//! expiry and an HMAC signature; presigned uploads hand the same URL to the
//! client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use zeroize::Zeroizing;

use super::signing::{EXPIRES_PARAM, SIGNATURE_PARAM, canonical_request, sign};
use crate::domain::ports::{ObjectHead, ObjectStore, ObjectStoreError, PresignedUpload};

/// Lifetime of URLs the backend signs for its own calls.
const SERVER_URL_TTL_SECONDS: i64 = 300;

/// Connection and signing settings.
pub struct ObjectStoreSettings {
    pub endpoint: Url,
    pub bucket: String,
    pub signing_secret: Zeroizing<String>,
    /// Base URL under which stored objects are publicly readable.
    pub public_base_url: Option<String>,
    pub timeout: Duration,
}

/// Object store reached over HTTP with signed URLs.
pub struct HttpObjectStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    secret: Zeroizing<Vec<u8>>,
    public_base_url: Option<String>,
    clock: Arc<dyn Clock>,
}

impl HttpObjectStore {
    /// Build the adapter with a reqwest client honouring `settings.timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(settings: ObjectStoreSettings, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint,
            bucket: settings.bucket.trim_matches('/').to_owned(),
            secret: Zeroizing::new(settings.signing_secret.as_bytes().to_vec()),
            public_base_url: settings
                .public_base_url
                .map(|base| base.trim_end_matches('/').to_owned()),
            clock,
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.path().trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        )
    }

    fn signed_url(
        &self,
        method: &Method,
        key: &str,
        content_type: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Url, ObjectStoreError> {
        let mut url = self.endpoint.clone();
        url.set_path(&self.object_path(key));
        url.set_query(None);
        let expires_unix = expires_at.timestamp();
        let canonical = canonical_request(method.as_str(), url.path(), content_type, expires_unix);
        let signature = sign(&self.secret, &canonical)
            .ok_or_else(|| ObjectStoreError::transport("object store signing key rejected"))?;
        url.query_pairs_mut()
            .append_pair(EXPIRES_PARAM, &expires_unix.to_string())
            .append_pair(SIGNATURE_PARAM, &signature);
        Ok(url)
    }

    fn server_url(
        &self,
        method: &Method,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<Url, ObjectStoreError> {
        let expires_at = self.clock.utc() + chrono::Duration::seconds(SERVER_URL_TTL_SECONDS);
        self.signed_url(method, key, content_type, expires_at)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PresignedUpload, ObjectStoreError> {
        let url = self.signed_url(&Method::PUT, key, Some(content_type), expires_at)?;
        Ok(PresignedUpload {
            url: url.to_string(),
            method: Method::PUT.as_str().to_owned(),
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            expires_at,
        })
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, ObjectStoreError> {
        let url = self.server_url(&Method::HEAD, key, None)?;
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status, &[]));
        }
        let headers = response.headers();
        let size_bytes = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(Some(ObjectHead {
            size_bytes,
            content_type,
        }))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let url = self.server_url(&Method::GET, key, None)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::not_found(key));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let url = self.server_url(&Method::PUT, key, Some(content_type))?;
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let url = self.server_url(&Method::DELETE, key, None)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/{}", key.trim_start_matches('/')))
    }
}

fn map_transport_error(error: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ObjectStoreError {
    ObjectStoreError::rejected(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
