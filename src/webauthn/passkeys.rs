//! # webauthn-rs Relying Party
//!
//! [`RelyingParty`] backed by `webauthn-rs` passkey ceremonies.
//!
//! A `Webauthn` instance is tied to one RP ID and origin. Since those are
//! resolved per request, an instance is built for each call; building one
//! only validates and copies the identity.
//!
//! The library's state objects (`PasskeyRegistration`, `PasskeyAuthentication`)
//! and the `Passkey` itself are stored as serialized JSON, which needs the
//! `danger-allow-state-serialisation` feature.

use super::{
    IssuedCeremony, RelyingParty, RpIdentity, VerifiedAuthentication, VerifiedRegistration,
};
use crate::db::models::{DeviceRecord, UserRecord};
use crate::error::{AppError, AppResult};
use serde::Serialize;
use serde_json::Value;
use webauthn_rs::prelude::*;

#[derive(Debug, Default, Clone)]
pub struct PasskeyRelyingParty;

impl PasskeyRelyingParty {
    pub fn new() -> Self {
        Self
    }

    fn webauthn(&self, rp: &RpIdentity) -> AppResult<Webauthn> {
        let origin = Url::parse(&rp.origin).map_err(|e| {
            AppError::BadRequest(format!("Invalid relying party origin '{}': {}", rp.origin, e))
        })?;

        let webauthn = WebauthnBuilder::new(&rp.id, &origin)?
            .rp_name(&rp.name)
            .build()?;

        Ok(webauthn)
    }
}

/// Serialize the browser-facing options and pull out the challenge they carry
fn issued<O: Serialize, S: Serialize>(options: &O, state: &S) -> AppResult<IssuedCeremony> {
    let options = serde_json::to_value(options)?;
    let challenge = options
        .pointer("/publicKey/challenge")
        .and_then(Value::as_str)
        .filter(|challenge| !challenge.is_empty())
        .ok_or_else(|| AppError::Internal("ceremony options carry no challenge".to_string()))?
        .to_string();

    Ok(IssuedCeremony {
        options,
        challenge,
        state: serde_json::to_value(state)?,
    })
}

impl RelyingParty for PasskeyRelyingParty {
    fn registration_options(&self, rp: &RpIdentity, user: &UserRecord) -> AppResult<IssuedCeremony> {
        let user_uuid = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Internal("Invalid user UUID".to_string()))?;

        // Don't let the same authenticator register twice
        let exclude: Vec<CredentialID> = user
            .devices
            .iter()
            .map(|device| CredentialID::from(device.credential_id.clone()))
            .collect();
        let exclude = (!exclude.is_empty()).then_some(exclude);

        let (ccr, reg_state) = self.webauthn(rp)?.start_passkey_registration(
            user_uuid,
            &user.username,
            &user.username,
            exclude,
        )?;

        issued(&ccr, &reg_state)
    }

    fn verify_registration(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
    ) -> AppResult<VerifiedRegistration> {
        let credential: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| AppError::BadRequest(format!("Malformed registration response: {}", e)))?;
        let reg_state: PasskeyRegistration = serde_json::from_value(state.clone())?;

        let passkey = self
            .webauthn(rp)?
            .finish_passkey_registration(&credential, &reg_state)?;

        let credential_public_key = serde_json::to_vec(&passkey)?;
        let counter = serde_json::to_value(&passkey)?
            .pointer("/cred/counter")
            .and_then(Value::as_u64)
            .and_then(|counter| u32::try_from(counter).ok())
            .unwrap_or(0);

        Ok(VerifiedRegistration {
            credential_id: passkey.cred_id().clone().into(),
            credential_public_key,
            counter,
        })
    }

    fn authentication_options(
        &self,
        rp: &RpIdentity,
        devices: &[DeviceRecord],
    ) -> AppResult<IssuedCeremony> {
        let passkeys = devices
            .iter()
            .map(|device| serde_json::from_slice::<Passkey>(&device.credential_public_key))
            .collect::<Result<Vec<_>, _>>()?;

        let (rcr, auth_state) = self.webauthn(rp)?.start_passkey_authentication(&passkeys)?;

        issued(&rcr, &auth_state)
    }

    fn verify_authentication(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
        device: &DeviceRecord,
    ) -> AppResult<VerifiedAuthentication> {
        let credential: PublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| AppError::BadRequest(format!("Malformed authentication response: {}", e)))?;
        let auth_state: PasskeyAuthentication = serde_json::from_value(state.clone())?;

        let result = self
            .webauthn(rp)?
            .finish_passkey_authentication(&credential, &auth_state)?;

        let credential_id: Vec<u8> = result.cred_id().clone().into();
        if credential_id != device.credential_id {
            return Err(AppError::Verification(
                "assertion was made with a different credential".to_string(),
            ));
        }

        // Keep the stored Passkey's own counter in step, the library checks it next time
        let mut passkey: Passkey = serde_json::from_slice(&device.credential_public_key)?;
        let credential_public_key = match passkey.update_credential(&result) {
            Some(true) => Some(serde_json::to_vec(&passkey)?),
            _ => None,
        };

        Ok(VerifiedAuthentication {
            credential_id,
            new_counter: result.counter(),
            credential_public_key,
        })
    }
}
