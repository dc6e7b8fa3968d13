//! # WebAuthn API Types
//!
//! Request/response bodies for the four ceremony endpoints.
//!
//! ## API Flow
//! Each ceremony has two steps: options and verify
//! - Options: server issues a challenge, client receives it
//! - Verify: client sends the authenticator's response, server checks it

use crate::config::DEFAULT_USERNAME;
use serde::{Deserialize, Serialize};

/// Body of both options endpoints
///
/// ## Example JSON
/// ```json
/// { "username": "alice" }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OptionsRequest {
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of both verify endpoints
///
/// `response` is whatever the browser's WebAuthn call produced; it is kept
/// as raw JSON and parsed by the WebAuthn library.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub response: serde_json::Value,
}

/// Result of a verify call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// Missing or empty usernames fall back to [`DEFAULT_USERNAME`]
pub fn username_or_default(username: Option<String>) -> String {
    username
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string())
}
