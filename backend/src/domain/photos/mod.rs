//! Review photo uploads: presigned upload, confirm, asynchronous
//! optimisation and cleanup.

mod keys;
mod model;
mod optimise;
mod service;
mod worker;

pub use keys::{
    ACCEPTED_MIME_TYPES, extension_for, final_object_key, temp_object_key, temp_prefix,
};
pub use model::{PhotoUpload, PhotoUploadStatus, UnknownPhotoUploadStatus};
pub use optimise::{OptimisationPolicy, OptimisedImage, OutputFormat, choose_output};
pub use service::{
    ConfirmPhotoRequest, MAX_UPLOAD_BYTES, PRESIGN_TTL_MINUTES, PhotoService, PhotoUploadView,
    PresignPhotoRequest, PresignPhotoResponse,
};
pub use worker::{
    CleanupRetention, PHOTO_ERROR_MAX_CHARS, PHOTO_STUCK_LEASE_MINUTES, PhotoCleanup, PhotoWorker,
};
