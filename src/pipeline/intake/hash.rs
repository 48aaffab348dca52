use base64::Engine;
use sha2::{Digest, Sha256};

/// SHA-256 content hash of an upload, base64-encoded.
/// Byte-identical uploads and only those share a hash.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}
