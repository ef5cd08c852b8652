//! Summary fingerprints for duplicate detection across a user's reviews.

use sha2::{Digest, Sha256};

/// Hash of the summary with case, punctuation and spacing folded away.
///
/// # Examples
/// ```
/// use backend::domain::reviews::summary_fingerprint;
///
/// assert_eq!(
///     summary_fingerprint("Great  coffee!"),
///     summary_fingerprint("great coffee"),
/// );
/// ```
#[must_use]
pub fn summary_fingerprint(summary: &str) -> String {
    let folded: String = summary
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect();
    let normalized = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    hex::encode(Sha256::digest(normalized.as_bytes()))
}
