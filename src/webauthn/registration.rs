//! # Passkey Registration Logic
//!
//! Registration is a two-step process: options and verify.
//!
//! ## Registration Flow
//! 1. **Options**: look up or create the user, issue a challenge, remember it
//! 2. **Verify**: take the remembered challenge, verify the new credential,
//!    store its public key
//!
//! ## Security Concepts
//! - **Challenge**: Random value the authenticator signs, single use
//! - **Public Key Cryptography**: Server stores the public key, the private key stays on the device

use crate::db::models::{CeremonyKind, DeviceRecord, PendingChallenge};
use crate::db::{challenges, credentials, users};
use crate::error::AppResult;
use crate::state::AppState;
use crate::webauthn::RpIdentity;
use serde_json::Value;

/// Issue registration options for `username`
///
/// ## Flow
/// 1. Look up the user, creating the record on first contact
/// 2. Ask the relying party for creation options, excluding existing credentials
/// 3. Store the challenge as the user's pending challenge (replacing any older one)
/// 4. Return the options verbatim
pub async fn issue_options(state: &AppState, rp: &RpIdentity, username: &str) -> AppResult<Value> {
    let user = users::get_or_create_user(state.store(), username).await?;

    let issued = state.relying_party.registration_options(rp, &user)?;

    let pending = PendingChallenge::new(CeremonyKind::Registration, issued.challenge, issued.state);
    challenges::save_challenge(state.store(), &user.username, pending).await?;

    tracing::debug!(username, rp_id = %rp.id, "Issued registration options");
    Ok(issued.options)
}

/// Verify a registration response and store the new credential
///
/// ## Flow
/// 1. Take (and so clear) the pending registration challenge
/// 2. Verify the response against the stored ceremony state
/// 3. Append the credential with the transports the browser reported
///
/// ## Errors
/// - BadRequest: no registration in progress, expired challenge, duplicate credential
/// - WebAuthn: the library rejected the response
pub async fn verify(
    state: &AppState,
    rp: &RpIdentity,
    username: &str,
    response: &Value,
) -> AppResult<()> {
    let (_, pending) = challenges::take_challenge(
        state.store(),
        username,
        CeremonyKind::Registration,
        state.config.challenge_ttl(),
    )
    .await?;

    let registration = state
        .relying_party
        .verify_registration(rp, response, &pending.state)?;

    let device = DeviceRecord {
        credential_id: registration.credential_id,
        credential_public_key: registration.credential_public_key,
        counter: registration.counter,
        transports: transports_from(response),
    };
    credentials::add_device(state.store(), username, device).await?;

    Ok(())
}

/// `response.response.transports` as sent by the browser, if well formed
fn transports_from(response: &Value) -> Option<Vec<String>> {
    response
        .pointer("/response/transports")
        .cloned()
        .and_then(|transports| serde_json::from_value(transports).ok())
}
