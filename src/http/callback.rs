//! OAuth callback relay.
//!
//! The identity provider redirects the browser to the proxy's origin; the
//! backend finishes the login, sets the session cookie and answers with a
//! redirect. The relay always answers with a redirect itself so a backend
//! error page never reaches the browser mid-login.

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, LOCATION};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::Response;

use crate::cookies::{reissue_cookies, RequestCookie};
use crate::http::forward::{BackendProxy, ProxyError, ProxyRequest};

/// Where the browser lands when the backend gives no redirect target.
pub const CALLBACK_ERROR_REDIRECT: &str = "/auth/callback?status=error";

/// Relay `GET {callback_path}?{query}` to the same path on the backend.
pub async fn relay_oauth_callback(
    proxy: &BackendProxy,
    callback_path: &str,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (parts, _body) = request.into_parts();

    let upstream = proxy
        .forward(ProxyRequest {
            method: Method::GET,
            path: callback_path.to_string(),
            query: parts.uri.query().map(str::to_string),
            cookies: RequestCookie::from_headers(&parts.headers),
            headers: parts.headers,
            body: None,
        })
        .await?;

    let status = if upstream.status.is_redirection() {
        upstream.status
    } else {
        tracing::warn!(status = %upstream.status, "OAuth callback did not redirect, using fallback");
        StatusCode::TEMPORARY_REDIRECT
    };
    let location = upstream
        .location
        .unwrap_or_else(|| HeaderValue::from_static(CALLBACK_ERROR_REDIRECT));

    // The backend body is discarded, so its framing headers must go too.
    let mut headers = upstream.headers;
    headers.remove(LOCATION);
    headers.remove(CONTENT_LENGTH);

    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    reissue_cookies(response.headers_mut(), &upstream.cookies);
    response.headers_mut().insert(LOCATION, location);

    Ok(response)
}
