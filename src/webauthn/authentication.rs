use crate::db::models::{CeremonyKind, PendingChallenge};
use crate::db::{challenges, credentials, users};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webauthn::RpIdentity;
use serde_json::Value;

/// Issue login options listing the user's registered credentials
pub async fn issue_options(state: &AppState, rp: &RpIdentity, username: &str) -> AppResult<Value> {
    let user = users::get_user(state.store(), username)
        .await?
        .filter(|user| !user.devices.is_empty())
        .ok_or_else(|| AppError::BadRequest("No passkey registered.".to_string()))?;

    let issued = state.relying_party.authentication_options(rp, &user.devices)?;

    let pending = PendingChallenge::new(CeremonyKind::Authentication, issued.challenge, issued.state);
    challenges::save_challenge(state.store(), &user.username, pending).await?;

    tracing::debug!(username, devices = user.devices.len(), "Issued login options");
    Ok(issued.options)
}

/// Verify an assertion and record the authenticator's new counter
pub async fn verify(
    state: &AppState,
    rp: &RpIdentity,
    username: &str,
    response: &Value,
) -> AppResult<()> {
    // Taken before anything else so a failed attempt cannot be retried
    let (user, pending) = challenges::take_challenge(
        state.store(),
        username,
        CeremonyKind::Authentication,
        state.config.challenge_ttl(),
    )
    .await?;

    let credential_id = response
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Missing credential id.".to_string()))?;
    let device = user
        .find_device(credential_id)
        .ok_or_else(|| AppError::BadRequest("Device not found.".to_string()))?;

    let outcome = state
        .relying_party
        .verify_authentication(rp, response, &pending.state, device)?;

    credentials::update_counter(
        state.store(),
        username,
        &outcome.credential_id,
        outcome.new_counter,
        outcome.credential_public_key,
    )
    .await?;

    tracing::info!(username, credential_id, "Passkey login verified");
    Ok(())
}
