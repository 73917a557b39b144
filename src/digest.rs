//! Payload digest helper.
//!
//! Digests are computed by the fetch pipeline and handed to the writer in
//! `<algorithm>:<hex>` form; the writer never recomputes them. This helper
//! produces that form for callers that do not already have one.

use sha1::{Digest, Sha1};

/// Algorithm prefix used by [`payload_digest`].
pub const SHA1_PREFIX: &str = "sha1:";

/// SHA-1 digest of `data` in `sha1:<hex>` form.
pub fn payload_digest(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{}{}", SHA1_PREFIX, hex::encode(hasher.finalize()))
}
