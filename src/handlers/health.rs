//! # Health Check Handler
//!
//! Used by load balancers and monitoring.

use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Health check endpoint
///
/// ## Route
/// GET /health
///
/// ## Response
/// ```json
/// { "status": "healthy", "service": "passkey-kv-server", "store": "redis" }
/// ```
///
/// Does not touch the store; it only reports which backend is configured.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "passkey-kv-server",
        "store": state.store().backend()
    }))
}
