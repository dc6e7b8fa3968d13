//! # WebAuthn Module
//!
//! Ceremony logic for passwordless authentication.
//!
//! ## Submodules
//! - `types`: Request/response bodies for the API
//! - `identity`: Which relying party a request is for
//! - `passkeys`: [`RelyingParty`] implemented with webauthn-rs
//! - `registration`: Creating new passkey credentials
//! - `authentication`: Logging in with existing passkeys
//!
//! ## WebAuthn Flow Overview
//!
//! ### Registration (Creating a Passkey)
//! 1. Client requests options → `registration::issue_options()`
//! 2. Server stores the challenge and returns the options verbatim
//! 3. Browser creates a credential with the authenticator
//! 4. Client posts the credential → `registration::verify()`
//! 5. Server takes the challenge, verifies, stores the public key
//!
//! ### Authentication (Logging In)
//! 1. Client requests options → `authentication::issue_options()`
//! 2. Server returns a challenge and the user's allowed credentials
//! 3. Browser signs the challenge with the authenticator
//! 4. Client posts the assertion → `authentication::verify()`
//! 5. Server verifies the signature and records the new counter

pub mod authentication;
pub mod identity;
pub mod passkeys;
pub mod registration;
pub mod types;

pub use identity::RpIdentity;
pub use passkeys::PasskeyRelyingParty;

use crate::db::models::{DeviceRecord, UserRecord};
use crate::error::AppResult;
use serde_json::Value;

/// Ceremony options ready to hand to the browser
#[derive(Debug, Clone)]
pub struct IssuedCeremony {
    /// Returned verbatim as the HTTP response body
    pub options: Value,

    /// The challenge inside `options`
    pub challenge: String,

    /// Server-side state needed to verify the response later
    pub state: Value,
}

/// A credential produced by a verified registration
#[derive(Debug, Clone)]
pub struct VerifiedRegistration {
    pub credential_id: Vec<u8>,
    pub credential_public_key: Vec<u8>,
    pub counter: u32,
}

/// Outcome of a verified assertion
#[derive(Debug, Clone)]
pub struct VerifiedAuthentication {
    pub credential_id: Vec<u8>,
    pub new_counter: u32,

    /// Replacement for the stored credential blob, when it changed
    pub credential_public_key: Option<Vec<u8>>,
}

/// The WebAuthn library boundary
///
/// Everything cryptographic happens behind this trait: challenge
/// generation, attestation/assertion verification, origin and RP-ID checks.
/// Handlers only move its inputs and outputs in and out of storage.
pub trait RelyingParty: Send + Sync {
    fn registration_options(&self, rp: &RpIdentity, user: &UserRecord) -> AppResult<IssuedCeremony>;

    fn verify_registration(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
    ) -> AppResult<VerifiedRegistration>;

    fn authentication_options(
        &self,
        rp: &RpIdentity,
        devices: &[DeviceRecord],
    ) -> AppResult<IssuedCeremony>;

    fn verify_authentication(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
        device: &DeviceRecord,
    ) -> AppResult<VerifiedAuthentication>;
}
