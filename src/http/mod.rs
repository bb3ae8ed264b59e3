//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request span)
//!     → forward.rs (path/query mapping, hygiene, streaming, cookie reissue)
//!       or callback.rs (OAuth callback relay, always a redirect)
//!     → response.rs (hop-by-hop and cookie header filtering)
//!     → Send to client
//! ```

pub mod callback;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{BackendProxy, BackendTarget, ProxyError, ProxyRequest, ProxyResponse};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
