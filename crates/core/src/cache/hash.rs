//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the cache key for a request method and URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for a [`Request`].
pub fn request_key(request: &Request) -> String {
    compute_cache_key(request.method(), request.url().as_str())
}

/// Hex SHA-256 of a response body, for reporting and comparisons.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "http://localhost:8080/index.html");
        let hash2 = compute_cache_key("GET", "http://localhost:8080/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", "http://localhost:8080/api");
        let head = compute_cache_key("HEAD", "http://localhost:8080/api");
        assert_ne!(get, head);
    }

    #[test]
    fn test_request_key_ignores_fragment() {
        let plain = Request::get(Url::parse("http://localhost:8080/game.js").unwrap());
        let anchored = Request::get(Url::parse("http://localhost:8080/game.js#L10").unwrap());
        assert_eq!(request_key(&plain), request_key(&anchored));
    }

    #[test]
    fn test_request_key_keeps_query() {
        let a = Request::get(Url::parse("http://localhost:8080/data/cases.json?v=1").unwrap());
        let b = Request::get(Url::parse("http://localhost:8080/data/cases.json?v=2").unwrap());
        assert_ne!(request_key(&a), request_key(&b));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "http://localhost:8080/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(body_digest(b"").len(), 64);
    }
}
