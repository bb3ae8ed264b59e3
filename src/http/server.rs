//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the proxy and OAuth callback routes
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown signal, applying config reloads meanwhile

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{validate_config, AppConfig, ConfigError};
use crate::http::callback::relay_oauth_callback;
use crate::http::forward::{BackendProxy, BackendTarget, ProxyRequest};
use crate::http::request::{
    make_request_span, propagate_request_id_layer, request_id, set_request_id_layer,
};
use crate::observability::metrics;

/// The proxy answers 504 on its own once `request_secs` pass; the outer
/// layer only fires if a handler overruns that.
const OUTER_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: BackendProxy,
    pub proxy_prefix: Arc<str>,
    pub callback_path: Arc<str>,
}

/// HTTP server for the team progress proxy.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    proxy: BackendProxy,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when the configuration is invalid, most notably when no backend
    /// base URL is configured.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let base_url = config.backend.base_url.as_deref().unwrap_or_default();
        let target = BackendTarget::new(base_url).map_err(|e| ConfigError::Validation(vec![e]))?;
        let proxy = BackendProxy::new(target, &config.timeouts);

        let state = AppState {
            proxy: proxy.clone(),
            proxy_prefix: Arc::from(config.backend.proxy_prefix.as_str()),
            callback_path: Arc::from(config.backend.oauth_callback_path.as_str()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            proxy,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let prefix = config.backend.proxy_prefix.as_str();

        Router::new()
            .route(prefix, any(forward_handler))
            .route(&format!("{}/{{*path}}", prefix), any(forward_handler))
            .route(&config.backend.oauth_callback_path, get(callback_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(
                        Duration::from_secs(config.timeouts.request_secs) + OUTER_TIMEOUT_GRACE,
                    )),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates swap the backend target; the route layout is
    /// fixed for the lifetime of the server.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.proxy.target().base(),
            prefix = %self.config.backend.proxy_prefix,
            "HTTP server starting"
        );

        let proxy = self.proxy.clone();
        let current_prefix = self.config.backend.proxy_prefix.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_reload(&proxy, &current_prefix, &new_config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn apply_reload(proxy: &BackendProxy, current_prefix: &str, config: &AppConfig) {
    let Some(base_url) = config.backend.base_url.as_deref() else {
        tracing::warn!("Reloaded config has no backend base URL, keeping current target");
        return;
    };
    match BackendTarget::new(base_url) {
        Ok(target) => {
            if *proxy.target() != target {
                tracing::info!(backend = %target.base(), "Backend target reloaded");
                proxy.swap_target(target);
            }
        }
        Err(e) => tracing::error!(error = %e, "Rejected reloaded backend target"),
    }
    if config.backend.proxy_prefix != current_prefix {
        tracing::warn!(
            prefix = %config.backend.proxy_prefix,
            "Proxy prefix changes take effect after restart"
        );
    }
}

/// Forward everything under the proxy prefix to the backend.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(request.headers()).to_string();

    let proxy_request = ProxyRequest::from_http(request, &state.proxy_prefix);
    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %proxy_request.path,
        cookies = proxy_request.cookies.len(),
        "Proxying request"
    );

    let response = match state.proxy.forward(proxy_request).await {
        Ok(upstream) => {
            tracing::debug!(
                request_id = %request_id,
                status = %upstream.status,
                cookies = upstream.cookies.len(),
                "Backend responded"
            );
            upstream.into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

/// Relay the OAuth callback and always answer with a redirect.
async fn callback_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    let response = match relay_oauth_callback(&state.proxy, &state.callback_path, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "OAuth callback relay failed");
            e.into_response()
        }
    };

    metrics::record_request("GET", response.status().as_u16(), start_time);
    response
}

/// `{prefix}/` is not matched by the wildcard route; everything else is 404.
async fn fallback_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if request.uri().path() == format!("{}/", state.proxy_prefix) {
        return forward_handler(State(state), request).await;
    }

    tracing::warn!(path = %request.uri().path(), "No route matched");
    (StatusCode::NOT_FOUND, "No matching route found").into_response()
}
