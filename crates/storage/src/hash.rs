//! Content addressing for uploaded artifacts.
//!
//! Every `File` is keyed by the SHA-256 of its bytes, which doubles as the
//! input to the orchestrator's duplicate-upload coalescer.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Build the storage path for an artifact, sharding by the first two hex
/// characters of its content hash so no single directory accumulates every
/// upload.
pub fn storage_key(content_hash: &str, original_filename: &str) -> String {
    let shard = &content_hash[..content_hash.len().min(2)];
    format!("documents/{shard}/{content_hash}/{original_filename}")
}

/// Build the storage path for a derived page image under a document's
/// content hash.
pub fn page_image_key(content_hash: &str, page_number: u32) -> String {
    let shard = &content_hash[..content_hash.len().min(2)];
    format!("documents/{shard}/{content_hash}/pages/{page_number:04}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn storage_key_shards_by_hash_prefix() {
        let hash = content_hash(b"invoice-bytes");
        let key = storage_key(&hash, "invoice.pdf");
        assert!(key.starts_with(&format!("documents/{}/", &hash[..2])));
        assert!(key.ends_with("invoice.pdf"));
    }

    #[test]
    fn page_image_key_is_zero_padded() {
        let hash = content_hash(b"x");
        let key = page_image_key(&hash, 3);
        assert!(key.ends_with("pages/0003.png"));
    }
}
