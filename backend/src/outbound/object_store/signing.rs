//! URL signing shared by presigned uploads and server-side calls.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the expiry as unix seconds.
pub(super) const EXPIRES_PARAM: &str = "X-Gk-Expires";
/// Query parameter carrying the hex signature.
pub(super) const SIGNATURE_PARAM: &str = "X-Gk-Signature";

/// String that the signature covers.
pub(super) fn canonical_request(
    method: &str,
    path: &str,
    content_type: Option<&str>,
    expires_unix: i64,
) -> String {
    format!(
        "{method}\n{path}\n{}\n{expires_unix}",
        content_type.unwrap_or_default()
    )
}

/// Hex HMAC-SHA256 of `canonical` under `secret`.
///
/// `None` only when the MAC rejects the key, which HMAC never does.
pub(super) fn sign(secret: &[u8], canonical: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(canonical.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}
