//! Cookie-forwarding passthrough to the backend.
//!
//! # Responsibilities
//! - Map `{prefix}{path}?{query}` onto `{base}{path}?{query}` byte for byte
//! - Enforce header hygiene in both directions
//! - Stream request and response bodies without buffering
//! - Reissue backend cookies on the proxy's own origin
//!
//! # Design Decisions
//! - The hyper client never follows redirects; `Location` reaches the browser
//! - No response caching and no retries: the proxy is a transparent pipe
//! - The backend target sits behind an `ArcSwap` so reloads never block requests

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, COOKIE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::config::{TimeoutConfig, ValidationError};
use crate::cookies::{cookie_header, extract_set_cookies, reissue_cookies, RequestCookie, SetCookie};
use crate::http::response::{filter_request_headers, filter_response_headers};

/// Errors surfaced to the proxy caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Forwarded path or query cannot form a valid backend URI.
    #[error("invalid backend target: {0}")]
    InvalidTarget(String),

    /// Backend unreachable or the exchange failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// Backend accepted the request but sent no response head in time.
    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match self {
            ProxyError::InvalidTarget(_) => "Invalid proxy target",
            ProxyError::Upstream(_) => "Upstream request failed",
            ProxyError::UpstreamTimeout(_) => "Upstream request timed out",
        };
        (self.status(), message).into_response()
    }
}

/// Backend origin the proxy forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// Base URL without trailing slash.
    base: String,
    /// True when the base URL carries a path of its own.
    has_path: bool,
}

impl BackendTarget {
    pub fn new(base_url: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(base_url)
            .map_err(|_| ValidationError::InvalidBackendBaseUrl(base_url.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(ValidationError::UnsupportedBackendScheme(base_url.to_string()));
        }

        let base = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            has_path: parsed.path() != "/",
            base,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Build the backend URI for a forwarded path and raw query string.
    ///
    /// An empty path maps to the bare backend root.
    pub fn uri_for(&self, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let mut target = String::with_capacity(self.base.len() + path.len() + 16);
        target.push_str(&self.base);
        if path.is_empty() {
            if !self.has_path {
                target.push('/');
            }
        } else {
            if !path.starts_with('/') {
                target.push('/');
            }
            target.push_str(path);
        }
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }

        target
            .parse::<Uri>()
            .map_err(|_| ProxyError::InvalidTarget(target))
    }
}

/// An inbound request, detached from the HTTP server types.
pub struct ProxyRequest {
    pub method: Method,
    /// Path after the proxy prefix, still percent-encoded.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub cookies: Vec<RequestCookie>,
    pub body: Option<Body>,
}

impl ProxyRequest {
    /// Split an inbound request mounted under `prefix`.
    pub fn from_http(request: Request<Body>, prefix: &str) -> Self {
        let (parts, body) = request.into_parts();
        let path = parts
            .uri
            .path()
            .strip_prefix(prefix)
            .unwrap_or_default()
            .to_string();
        let cookies = RequestCookie::from_headers(&parts.headers);
        let has_body = parts.method != Method::GET && parts.method != Method::HEAD;

        Self {
            path,
            query: parts.uri.query().map(str::to_string),
            cookies,
            body: has_body.then_some(body),
            method: parts.method,
            headers: parts.headers,
        }
    }
}

/// The backend's answer, ready to be written to the client.
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub cookies: Vec<SetCookie>,
    pub location: Option<HeaderValue>,
    pub body: Body,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        reissue_cookies(response.headers_mut(), &self.cookies);
        if let Some(location) = self.location {
            response.headers_mut().insert(LOCATION, location);
        }
        response
    }
}

/// Stateless forwarder shared by all proxy routes.
#[derive(Clone)]
pub struct BackendProxy {
    target: Arc<ArcSwap<BackendTarget>>,
    client: Client<HttpConnector, Body>,
    /// Bound on waiting for the response head; body streaming is unbounded.
    request_timeout: Duration,
}

impl BackendProxy {
    pub fn new(target: BackendTarget, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            target: Arc::new(ArcSwap::from_pointee(target)),
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Current backend target.
    pub fn target(&self) -> Arc<BackendTarget> {
        self.target.load_full()
    }

    /// Atomically replace the backend target for subsequent requests.
    pub fn swap_target(&self, target: BackendTarget) {
        self.target.store(Arc::new(target));
    }

    /// Forward one request to the backend and shape its response.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let uri = self
            .target
            .load()
            .uri_for(&request.path, request.query.as_deref())?;

        let mut headers = filter_request_headers(&request.headers);
        if let Some(cookie) = cookie_header(&request.cookies) {
            headers.insert(COOKIE, cookie);
        }
        let body = match request.body {
            Some(body) => body,
            None => {
                headers.remove(CONTENT_LENGTH);
                Body::empty()
            }
        };

        let mut outbound = Request::new(body);
        *outbound.method_mut() = request.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::debug!(method = %outbound.method(), uri = %outbound.uri(), "Forwarding to backend");

        let response = tokio::time::timeout(self.request_timeout, self.client.request(outbound))
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.request_timeout))??;
        let (parts, body) = response.into_parts();

        let cookies = extract_set_cookies(&parts.headers);
        let location = parts.headers.get(LOCATION).cloned();

        Ok(ProxyResponse {
            status: parts.status,
            headers: filter_response_headers(&parts.headers),
            cookies,
            location,
            body: Body::new(body),
        })
    }
}
