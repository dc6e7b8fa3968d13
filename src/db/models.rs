//! # Stored Models
//!
//! The structures persisted as JSON values in the key-value store, one
//! [`UserRecord`] per username.
//!
//! Field names are camelCase on disk and byte fields serialize as plain
//! number arrays, so a stored record looks like:
//!
//! ```json
//! {
//!   "id": "550e8400-e29b-41d4-a716-446655440000",
//!   "username": "alice",
//!   "devices": [
//!     { "credentialID": [1, 2, 3], "credentialPublicKey": [123, 34], "counter": 4, "transports": ["internal"] }
//!   ],
//!   "currentChallenge": { "challenge": "q5v...", "kind": "authentication", "state": {}, "issuedAt": "2024-01-15T10:30:00Z" }
//! }
//! ```

use crate::error::{AppError, AppResult};
use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// User account and its registered passkeys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Unique identifier (UUID v4), also the WebAuthn user handle
    pub id: String,

    /// Unique username; the store key
    pub username: String,

    /// Registered credentials
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,

    /// The ceremony currently waiting for a response, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_challenge: Option<PendingChallenge>,
}

impl UserRecord {
    /// Create a new user with a generated ID and no devices
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            devices: Vec::new(),
            current_challenge: None,
        }
    }

    /// Find a device by the base64url credential id a browser reports
    pub fn find_device(&self, credential_id: &str) -> Option<&DeviceRecord> {
        self.devices
            .iter()
            .find(|device| device.encoded_id() == credential_id)
    }

    pub fn find_device_mut(&mut self, credential_id: &[u8]) -> Option<&mut DeviceRecord> {
        self.devices
            .iter_mut()
            .find(|device| device.credential_id == credential_id)
    }
}

/// A registered passkey credential
///
/// Only the public half is stored. `credential_public_key` holds the
/// WebAuthn library's serialized credential and is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "credentialID")]
    pub credential_id: Vec<u8>,

    #[serde(rename = "credentialPublicKey")]
    pub credential_public_key: Vec<u8>,

    /// Signature counter last reported by the authenticator
    pub counter: u32,

    /// Transport hints ("usb", "nfc", "ble", "internal", "hybrid")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl DeviceRecord {
    /// Credential id as base64url without padding, the form browsers send
    pub fn encoded_id(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(&self.credential_id)
    }

    /// Record the counter from a successful assertion
    ///
    /// Authenticators without a counter always report 0; that is accepted.
    /// Otherwise the counter must strictly increase, anything else points
    /// at a cloned authenticator.
    pub fn advance_counter(&mut self, new_counter: u32) -> AppResult<()> {
        if (new_counter != 0 || self.counter != 0) && new_counter <= self.counter {
            return Err(AppError::Verification(format!(
                "signature counter went from {} to {}; credential may be cloned",
                self.counter, new_counter
            )));
        }
        self.counter = new_counter;
        Ok(())
    }
}

/// Which ceremony a pending challenge belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl CeremonyKind {
    /// Message returned when a verify request has nothing to verify against
    pub fn not_in_progress(self) -> &'static str {
        match self {
            CeremonyKind::Registration => "No registration in progress.",
            CeremonyKind::Authentication => "No login in progress.",
        }
    }
}

/// The single outstanding challenge for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChallenge {
    /// Challenge string as sent to the browser (base64url)
    pub challenge: String,

    pub kind: CeremonyKind,

    /// Serialized ceremony state from the WebAuthn library
    pub state: Value,

    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub fn new(kind: CeremonyKind, challenge: String, state: Value) -> Self {
        Self {
            challenge,
            kind,
            state,
            issued_at: Utc::now(),
        }
    }

    /// A deadline past chrono's representable range never expires
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.issued_at.checked_add_signed(ttl) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}
