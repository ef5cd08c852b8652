//! Photo upload state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PhotoUploadId, UserId};

/// Processing lifecycle of an uploaded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoUploadStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl PhotoUploadStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PhotoUploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for unknown stored statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown photo upload status: {0}")]
pub struct UnknownPhotoUploadStatus(pub String);

impl FromStr for PhotoUploadStatus {
    type Err = UnknownPhotoUploadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownPhotoUploadStatus(other.to_owned())),
        }
    }
}

/// `review_photo_uploads` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub id: PhotoUploadId,
    pub user_id: UserId,
    pub temp_object_key: String,
    pub status: PhotoUploadStatus,
    pub final_object_key: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
