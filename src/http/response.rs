//! Header hygiene across the proxy boundary.
//!
//! # Responsibilities
//! - Strip `Host` and hop-by-hop headers from requests sent to the backend
//! - Strip `Set-Cookie` and hop-by-hop headers from backend responses
//! - Honor headers nominated by the `Connection` header in both directions
//!
//! # Design Decisions
//! - Multi-valued headers are appended, never collapsed
//! - Header names compare case-insensitively (`HeaderName` is lowercase)

use axum::http::header::{CONNECTION, COOKIE, HOST, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName};

/// Headers meaningful only to a single connection.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if the header must never cross the proxy boundary.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Header names listed in `Connection: a, b` are hop-by-hop for this exchange.
fn connection_nominated(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn copy_filtered<F>(original: &HeaderMap, mut skip: F) -> HeaderMap
where
    F: FnMut(&HeaderName) -> bool,
{
    let nominated = connection_nominated(original);
    let mut headers = HeaderMap::with_capacity(original.len());
    for (name, value) in original.iter() {
        if is_hop_by_hop(name) || skip(name) || nominated.iter().any(|n| n.as_str() == name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Headers to send to the backend. `Cookie` is excluded as well: cookies
/// travel as an explicit list and are re-serialized by the caller.
pub fn filter_request_headers(original: &HeaderMap) -> HeaderMap {
    copy_filtered(original, |name| *name == HOST || *name == COOKIE)
}

/// Headers to return to the client. Cookies are reissued separately.
pub fn filter_response_headers(original: &HeaderMap) -> HeaderMap {
    copy_filtered(original, |name| *name == SET_COOKIE)
}
