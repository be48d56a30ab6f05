//! Entity tags for `GET /api/data`.
//!
//! The tag is a SHA-256 over the exact response body, so it changes
//! whenever any returned field does and never otherwise.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// Quoted strong ETag for `body`.
pub fn compute_etag(body: &[u8]) -> String {
  let hash = Sha256::digest(body);
  format!("\"{}\"", hex::encode(hash))
}

/// Whether the request's `If-None-Match` already names `etag`.
///
/// Accepts a comma-separated list, weak tags (`W/"..."`) and `*`.
pub fn is_fresh(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(|t| t.trim())
    .any(|t| t == "*" || t.strip_prefix("W/").unwrap_or(t) == etag)
}
