use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webauthn::types::*;
use crate::webauthn::{authentication, registration, RpIdentity};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    Json,
};
use serde_json::{json, Value};
use tower_sessions::Session;

/// Session key holding the signed-in username
pub const SESSION_USER_KEY: &str = "username";

fn relying_party(state: &AppState, headers: &HeaderMap) -> RpIdentity {
    let host = headers.get(header::HOST).and_then(|value| value.to_str().ok());
    RpIdentity::resolve(&state.config, host)
}

// Registration endpoints

pub async fn register_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<OptionsRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    let username = username_or_default(req.username);
    let rp = relying_party(&state, &headers);

    let options = registration::issue_options(&state, &rp, &username).await?;

    Ok(Json(options))
}

pub async fn register_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<VerifyResponse>> {
    let Json(req) = payload?;
    let username = username_or_default(req.username);
    let rp = relying_party(&state, &headers);

    registration::verify(&state, &rp, &username, &req.response).await?;

    Ok(Json(VerifyResponse { verified: true }))
}

// Authentication endpoints

pub async fn login_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<OptionsRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    let username = username_or_default(req.username);
    let rp = relying_party(&state, &headers);

    let options = authentication::issue_options(&state, &rp, &username).await?;

    Ok(Json(options))
}

pub async fn login_verify(
    session: Session,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<VerifyResponse>> {
    let Json(req) = payload?;
    let username = username_or_default(req.username);
    let rp = relying_party(&state, &headers);

    authentication::verify(&state, &rp, &username, &req.response).await?;

    session
        .insert(SESSION_USER_KEY, &username)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    Ok(Json(VerifyResponse { verified: true }))
}

// Session endpoints

pub async fn logout(session: Session) -> AppResult<Json<Value>> {
    session
        .delete()
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    Ok(Json(json!({
        "success": true
    })))
}

pub async fn session_info(session: Session) -> AppResult<Json<Value>> {
    let username: Option<String> = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    match username {
        Some(username) => Ok(Json(json!({
            "authenticated": true,
            "username": username
        }))),
        None => Ok(Json(json!({
            "authenticated": false
        }))),
    }
}
