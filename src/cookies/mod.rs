//! Cookie handling across the proxy boundary.
//!
//! # Data Flow
//! ```text
//! browser Cookie header
//!     → request_cookie.rs (explicit Vec<RequestCookie>)
//!     → re-serialized into one Cookie header towards the backend
//!
//! backend Set-Cookie lines
//!     → set_cookie.rs (parse, drop malformed and unknown attributes)
//!     → reissued on the proxy's own response
//! ```

pub mod request_cookie;
pub mod set_cookie;

pub use request_cookie::{cookie_header, parse_cookie_header, RequestCookie};
pub use set_cookie::{extract_set_cookies, reissue_cookies, MalformedSetCookie, SameSite, SetCookie};
