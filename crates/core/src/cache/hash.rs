//! Snapshot key generation.
//!
//! Request identity is method + URL; the key is the SHA-256 over both,
//! so lookups are exact-match by construction.

use sha2::{Digest, Sha256};

/// Compute the snapshot key for a request.
pub fn compute_snapshot_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_snapshot_key("GET", "https://example.com/index.html");
        let key2 = compute_snapshot_key("GET", "https://example.com/index.html");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_url() {
        let key1 = compute_snapshot_key("GET", "https://example.com/a.css");
        let key2 = compute_snapshot_key("GET", "https://example.com/b.css");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_method() {
        let get = compute_snapshot_key("GET", "https://example.com/");
        let head = compute_snapshot_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let upper = compute_snapshot_key("GET", "https://example.com/");
        let lower = compute_snapshot_key("get", "https://example.com/");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_key_format() {
        let key = compute_snapshot_key("GET", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
