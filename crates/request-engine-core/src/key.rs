//! Deterministic request-key derivation, used both as the cache key and as
//! the deduplication key for in-flight request coalescing.
//!
//! The key is `method | normalized-url | hash(sorted query) | hash(body)`.
//! Query parameters are sorted by name before hashing so that
//! `?a=1&b=2` and `?b=2&a=1` collapse to the same key, and the URL itself is
//! normalized (scheme/host lowercased, trailing slash on an empty path
//! dropped, default ports stripped) before being folded in.

use sha2::{Digest, Sha256};

use crate::method::Method;

/// Normalizes a URL for key derivation: lowercases scheme and host, strips
/// the default port for the scheme, and drops a trailing `/` when the path
/// is otherwise empty. Returns the original string unchanged if it fails to
/// parse as a URL, so callers never lose data to a malformed input.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.to_string();
    };

    let _ = url.set_scheme(&url.scheme().to_ascii_lowercase());
    if let Some(host) = url.host_str() {
        let lower = host.to_ascii_lowercase();
        let _ = url.set_host(Some(&lower));
    }

    let default_port = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default_port {
        let _ = url.set_port(None);
    }

    if url.path() == "/" && url.query().is_none() {
        url.set_path("");
    }

    url.into()
}

fn hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Hashes a query string after sorting its `key=value` pairs by key, so
/// that parameter order never affects the resulting key.
pub fn hash_sorted_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return hash_hex(b"");
    };
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();
    let normalized = pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hash_hex(normalized.as_bytes())
}

pub fn hash_body(body: Option<&[u8]>) -> String {
    hash_hex(body.unwrap_or(&[]))
}

/// Builds the deterministic `method|url|query-hash|body-hash` key used for
/// both caching and deduplication.
pub fn derive_key(method: Method, raw_url: &str, body: Option<&[u8]>) -> String {
    let parsed = url::Url::parse(raw_url).ok();
    let query = parsed.as_ref().and_then(|u| u.query());
    let normalized = normalize_url(raw_url);

    format!(
        "{}|{}|{}|{}",
        method.as_str(),
        strip_query(&normalized),
        hash_sorted_query(query),
        hash_body(body)
    )
}

fn strip_query(normalized_url: &str) -> &str {
    match normalized_url.split_once('?') {
        Some((base, _)) => base,
        None => normalized_url,
    }
}
