//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! The route guard is an extractor ([`RequireAuth`]) rather than a layer so
//! login and registration stay reachable.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    AuthRejection, CurrentUser, OptionalAuth, RequireAuth, Visitor, load_auth_session,
    store_auth_session,
};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
