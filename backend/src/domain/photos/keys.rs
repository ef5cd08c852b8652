//! Object key layout for review photos.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::UserId;

/// MIME types accepted for upload, with their canonical extension.
pub const ACCEPTED_MIME_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
    ("image/heic", "heic"),
];

/// Extension for an accepted MIME type.
#[must_use]
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let mime = mime_type.trim().to_ascii_lowercase();
    ACCEPTED_MIME_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == mime)
        .map(|(_, ext)| *ext)
}

/// Prefix under which a user's raw uploads live.
#[must_use]
pub fn temp_prefix(user_id: UserId) -> String {
    format!("reviews/users/{user_id}/tmp/")
}

/// Fresh temporary key for a presigned upload.
#[must_use]
pub fn temp_object_key(user_id: UserId, upload_token: Uuid, extension: &str) -> String {
    format!("{}{upload_token}.{extension}", temp_prefix(user_id))
}

/// Deterministic key of an optimised photo.
///
/// `bytes` are the optimised bytes; identical bytes yield the same hash.
///
/// # Examples
/// ```
/// use backend::domain::UserId;
/// use backend::domain::photos::final_object_key;
///
/// let user = UserId::random();
/// let a = final_object_key(user, 1_700_000_000, b"same", "jpg");
/// let b = final_object_key(user, 1_700_000_000, b"same", "jpg");
/// assert_eq!(a, b);
/// assert!(a.starts_with(&format!("reviews/users/{user}/optimized/1700000000_")));
/// ```
#[must_use]
pub fn final_object_key(user_id: UserId, unix_seconds: i64, bytes: &[u8], extension: &str) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let hash8: String = digest.chars().take(8).collect();
    format!("reviews/users/{user_id}/optimized/{unix_seconds}_{hash8}.{extension}")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("image/jpeg", Some("jpg"))]
    #[case(" IMAGE/WEBP ", Some("webp"))]
    #[case("image/gif", None)]
    fn extensions_for_accepted_types(#[case] mime: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension_for(mime), expected);
    }

    #[test]
    fn temp_keys_live_under_the_user_prefix() {
        let user = UserId::random();
        let key = temp_object_key(user, Uuid::nil(), "png");
        assert!(key.starts_with(&temp_prefix(user)));
        assert!(key.ends_with("00000000-0000-0000-0000-000000000000.png"));
    }

    #[test]
    fn final_keys_change_with_content() {
        let user = UserId::random();
        let first = final_object_key(user, 1, b"one", "jpg");
        let second = final_object_key(user, 1, b"two", "jpg");
        assert_ne!(first, second);
    }
}
