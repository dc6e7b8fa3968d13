//! # User Handlers
//!
//! Profile of the signed-in user.

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::SESSION_USER_KEY;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tower_sessions::Session;

/// Get the signed-in user's profile and passkeys
///
/// ## Route
/// GET /api/webauthn/me (behind `require_auth`)
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "username": "alice",
///   "devices": [{ "credentialID": "AQID", "counter": 4, "transports": ["internal"] }]
/// }
/// ```
///
/// Public key blobs are never returned.
pub async fn get_current_user(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let username: String = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let user = users::get_user(state.store(), &username)
        .await?
        .ok_or_else(|| AppError::UnknownUser(username.clone()))?;

    let devices: Vec<Value> = user
        .devices
        .iter()
        .map(|device| {
            json!({
                "credentialID": device.encoded_id(),
                "counter": device.counter,
                "transports": device.transports,
            })
        })
        .collect();

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "devices": devices
    })))
}
