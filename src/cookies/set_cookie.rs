//! `Set-Cookie` parsing and reissuing.
//!
//! Only the attributes the proxy can faithfully re-express on its own origin
//! are kept: `Path`, `Expires`, `Max-Age`, `SameSite`, `Secure`, `HttpOnly`.
//! Everything else, `Domain` included, is dropped so the browser binds the
//! reissued cookie to the proxy's origin.

use std::fmt;
use std::str::FromStr;

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Cookie date format emitted on reissue (IMF-fixdate).
const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Legacy Netscape format still produced by some servlet containers.
const LEGACY_COOKIE_DATE_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Why a `Set-Cookie` line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedSetCookie {
    #[error("empty Set-Cookie header")]
    Empty,
    #[error("no name=value pair")]
    MissingPair,
    #[error("empty cookie name")]
    EmptyName,
}

/// A cookie issued by the backend, reduced to the attributes we reissue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
            expires: None,
            max_age: None,
        }
    }

    /// Render as a header value for the proxy's response.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_bytes(self.to_string().as_bytes()).ok()
    }

    fn apply_attribute(&mut self, name: &str, value: &str) {
        match name.to_ascii_lowercase().as_str() {
            "path" => self.path = (!value.is_empty()).then(|| value.to_string()),
            "max-age" => {
                if let Ok(seconds) = value.parse::<i64>() {
                    self.max_age = Some(seconds);
                }
            }
            "expires" => {
                if let Some(date) = parse_cookie_date(value) {
                    self.expires = Some(date);
                }
            }
            "samesite" => {
                if let Some(same_site) = SameSite::parse(value) {
                    self.same_site = Some(same_site);
                }
            }
            "secure" => self.secure = true,
            "httponly" => self.http_only = true,
            _ => {}
        }
    }
}

impl FromStr for SetCookie {
    type Err = MalformedSetCookie;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split(';').map(str::trim).filter(|p| !p.is_empty());

        let pair = parts.next().ok_or(MalformedSetCookie::Empty)?;
        let (name, value) = pair.split_once('=').ok_or(MalformedSetCookie::MissingPair)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MalformedSetCookie::EmptyName);
        }

        let mut cookie = SetCookie::new(name, value.trim());
        for attribute in parts {
            let (attr_name, attr_value) = attribute
                .split_once('=')
                .map(|(n, v)| (n.trim(), v.trim()))
                .unwrap_or((attribute, ""));
            cookie.apply_attribute(attr_name, attr_value);
        }

        Ok(cookie)
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires.format(COOKIE_DATE_FORMAT))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, LEGACY_COOKIE_DATE_FORMAT)
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Parse every `Set-Cookie` header of a backend response.
///
/// Malformed lines are logged and skipped; they never fail the response.
pub fn extract_set_cookies(headers: &HeaderMap) -> Vec<SetCookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|raw| {
            let line = match std::str::from_utf8(raw.as_bytes()) {
                Ok(line) => line,
                Err(_) => {
                    tracing::warn!("Dropping Set-Cookie header that is not UTF-8");
                    return None;
                }
            };
            match line.parse::<SetCookie>() {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed Set-Cookie header");
                    None
                }
            }
        })
        .collect()
}

/// Append one `Set-Cookie` header per cookie to an outgoing response.
pub fn reissue_cookies(headers: &mut HeaderMap, cookies: &[SetCookie]) {
    for cookie in cookies {
        match cookie.to_header_value() {
            Some(value) => {
                headers.append(SET_COOKIE, value);
            }
            None => tracing::warn!(cookie = %cookie.name, "Cookie cannot be reissued as a header value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_session_cookie() {
        let cookie: SetCookie =
            "SESSION=abc123; Path=/; Max-Age=3600; Expires=Wed, 21 Oct 2026 07:28:00 GMT; Secure; HttpOnly; SameSite=Lax"
                .parse()
                .unwrap();

        assert_eq!(cookie.name, "SESSION");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.max_age, Some(3600));
        assert_eq!(
            cookie.expires,
            Some(Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap())
        );
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cookie: SetCookie = "token=a=b==; path=/api".parse().unwrap();
        assert_eq!(cookie.value, "a=b==");
        assert_eq!(cookie.path.as_deref(), Some("/api"));
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let cookie: SetCookie = "a=1; SAMESITE=STRICT; httponly; SECURE; max-age=0".parse().unwrap();
        assert_eq!(cookie.same_site, Some(SameSite::Strict));
        assert!(cookie.http_only);
        assert!(cookie.secure);
        assert_eq!(cookie.max_age, Some(0));
    }

    #[test]
    fn test_unknown_attributes_and_domain_are_dropped() {
        let cookie: SetCookie = "a=1; Domain=backend.internal; Priority=High; Partitioned"
            .parse()
            .unwrap();
        assert_eq!(cookie, SetCookie::new("a", "1"));
        assert_eq!(cookie.to_string(), "a=1");
    }

    #[test]
    fn test_invalid_attribute_values_are_ignored() {
        let cookie: SetCookie = "a=1; Max-Age=soon; Expires=tomorrow; SameSite=sometimes"
            .parse()
            .unwrap();
        assert_eq!(cookie.max_age, None);
        assert_eq!(cookie.expires, None);
        assert_eq!(cookie.same_site, None);
    }

    #[test]
    fn test_legacy_expires_format() {
        let cookie: SetCookie = "a=1; Expires=Thu, 01-Jan-1970 00:00:10 GMT".parse().unwrap();
        assert_eq!(cookie.expires, Some(Utc.timestamp_opt(10, 0).unwrap()));
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!("".parse::<SetCookie>(), Err(MalformedSetCookie::Empty));
        assert_eq!(" ; ; ".parse::<SetCookie>(), Err(MalformedSetCookie::Empty));
        assert_eq!("garbage; Path=/".parse::<SetCookie>(), Err(MalformedSetCookie::MissingPair));
        assert_eq!("=value; Path=/".parse::<SetCookie>(), Err(MalformedSetCookie::EmptyName));
    }

    #[test]
    fn test_render_keeps_recognized_attributes() {
        let mut cookie = SetCookie::new("SESSION", "xyz");
        cookie.path = Some("/".into());
        cookie.max_age = Some(-1);
        cookie.expires = Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap());
        cookie.same_site = Some(SameSite::None);
        cookie.secure = true;
        cookie.http_only = true;

        assert_eq!(
            cookie.to_string(),
            "SESSION=xyz; Path=/; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=-1; SameSite=None; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_extract_skips_malformed_lines() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("good=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("no-pair-here"));
        headers.append(SET_COOKIE, HeaderValue::from_static("other=2; HttpOnly"));

        let cookies = extract_set_cookies(&headers);
        let names: Vec<_> = cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["good", "other"]);
    }

    #[test]
    fn test_reissue_appends_one_header_per_cookie() {
        let mut headers = HeaderMap::new();
        reissue_cookies(
            &mut headers,
            &[SetCookie::new("a", "1"), SetCookie::new("b", "2")],
        );
        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_utf8_cookie_survives_extract_and_reissue() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_bytes("name=café; Path=/".as_bytes()).unwrap(),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("other=1"));

        let cookies = extract_set_cookies(&headers);
        let pairs: Vec<_> = cookies
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("name", "café"), ("other", "1")]);

        let mut reissued = HeaderMap::new();
        reissue_cookies(&mut reissued, &cookies);
        let values: Vec<_> = reissued.get_all(SET_COOKIE).iter().map(|v| v.as_bytes()).collect();
        assert_eq!(values, vec!["name=café; Path=/".as_bytes(), b"other=1".as_slice()]);
    }
}
