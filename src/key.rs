use sha2::{Digest, Sha256};

/// Number of digest bytes kept for the short key. 10 bytes hex-encode to a
/// 20-character key.
const KEY_BYTES: usize = 10;

/// Derive the short key for a URL.
///
/// Deterministic: the same URL always yields the same key, so repeated
/// submissions of a URL land on the same mapping. Distinct URLs can collide
/// only within the truncated digest's birthday bound; the store surfaces that
/// as a conflict rather than retrying.
pub fn generate_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..KEY_BYTES])
}
