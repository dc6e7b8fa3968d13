//! # Router
//!
//! All routes, middleware and the session layer in one place so the
//! binary and the integration tests serve exactly the same application.

use crate::handlers::auth::*;
use crate::handlers::health::health_check;
use crate::handlers::users::get_current_user;
use crate::middleware;
use crate::state::AppState;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Build the application router
///
/// ## Routes
/// - `GET  /health`
/// - `POST /api/webauthn/register/options` → `{username}` → creation options
/// - `POST /api/webauthn/register/verify`  → `{username, response}` → `{verified}`
/// - `POST /api/webauthn/login/options`    → `{username}` → request options
/// - `POST /api/webauthn/login/verify`     → `{username, response}` → `{verified}`
/// - `GET  /api/webauthn/session`, `POST /api/webauthn/logout`
/// - `GET  /api/webauthn/me` (signed-in only)
/// - anything else: static files from `STATIC_DIR`
pub fn build_router(state: AppState) -> Router {
    // Sessions only remember who logged in; they are server-side and
    // expire after 24 hours of inactivity.
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    // Allow any origin for the demo; restrict this in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected_routes = Router::new()
        .route("/api/webauthn/me", get(get_current_user))
        .layer(axum_middleware::from_fn(middleware::auth::require_auth))
        .with_state(state.clone());

    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/health", get(health_check))
        // Registration ceremony
        .route("/api/webauthn/register/options", post(register_options))
        .route("/api/webauthn/register/verify", post(register_verify))
        // Authentication ceremony
        .route("/api/webauthn/login/options", post(login_options))
        .route("/api/webauthn/login/verify", post(login_verify))
        // Session management
        .route("/api/webauthn/session", get(session_info))
        .route("/api/webauthn/logout", post(logout))
        .merge(protected_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
