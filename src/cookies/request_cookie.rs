//! Cookies sent by the browser, carried explicitly instead of read from an
//! ambient per-request store.

use std::fmt;
use std::str::FromStr;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

/// A single `name=value` pair from a `Cookie` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCookie {
    pub name: String,
    pub value: String,
}

impl RequestCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Collect cookies from every `Cookie` header (HTTP/2 may split them).
    pub fn from_headers(headers: &HeaderMap) -> Vec<Self> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| std::str::from_utf8(v.as_bytes()).ok())
            .flat_map(parse_cookie_header)
            .collect()
    }
}

impl FromStr for RequestCookie {
    type Err = String;

    fn from_str(pair: &str) -> Result<Self, Self::Err> {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", pair))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty cookie name in '{}'", pair));
        }
        Ok(Self::new(name, value.trim()))
    }
}

impl fmt::Display for RequestCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Split a `Cookie` header into its pairs, skipping unparseable fragments.
pub fn parse_cookie_header(header: &str) -> Vec<RequestCookie> {
    header
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Serialize cookies into a single `Cookie` header value.
///
/// Returns `None` when there is nothing to send.
pub fn cookie_header(cookies: &[RequestCookie]) -> Option<HeaderValue> {
    if cookies.is_empty() {
        return None;
    }
    let joined = cookies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_bytes(joined.as_bytes()).ok()
}
