//! # Credential Operations
//!
//! Adding passkeys to a user and recording signature counters after login.
//! Both go through [`users::update_user`], so concurrent requests for the
//! same user cannot overwrite each other.

use crate::db::kv::KvStore;
use crate::db::models::DeviceRecord;
use crate::db::users;
use crate::error::{AppError, AppResult};

/// Append a newly registered credential
///
/// ## Errors
/// BadRequest if the user already has a credential with this id.
pub async fn add_device(store: &dyn KvStore, username: &str, device: DeviceRecord) -> AppResult<()> {
    let encoded_id = device.encoded_id();

    users::update_user(store, username, |user| {
        if user.find_device_mut(&device.credential_id).is_some() {
            return Err(AppError::BadRequest(
                "Credential is already registered.".to_string(),
            ));
        }
        user.devices.push(device.clone());
        Ok(())
    })
    .await?;

    tracing::info!(username, credential_id = %encoded_id, "Registered passkey");
    Ok(())
}

/// Store the counter reported by a verified assertion
///
/// `credential_public_key` replaces the stored blob when the library
/// produced a refreshed copy of the credential.
///
/// ## Errors
/// - BadRequest: no such credential for this user
/// - Verification: the counter did not increase
pub async fn update_counter(
    store: &dyn KvStore,
    username: &str,
    credential_id: &[u8],
    new_counter: u32,
    credential_public_key: Option<Vec<u8>>,
) -> AppResult<()> {
    users::update_user(store, username, |user| {
        let device = user
            .find_device_mut(credential_id)
            .ok_or_else(|| AppError::BadRequest("Device not found.".to_string()))?;

        device.advance_counter(new_counter)?;
        if let Some(blob) = &credential_public_key {
            device.credential_public_key = blob.clone();
        }
        Ok(())
    })
    .await?;

    tracing::debug!(username, new_counter, "Updated signature counter");
    Ok(())
}
