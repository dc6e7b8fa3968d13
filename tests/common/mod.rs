#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::prelude::*;
use passkey_kv_server::db::kv::{KvStore, MemoryStore};
use passkey_kv_server::db::models::{DeviceRecord, UserRecord};
use passkey_kv_server::webauthn::{
    IssuedCeremony, RelyingParty, RpIdentity, VerifiedAuthentication, VerifiedRegistration,
};
use passkey_kv_server::{build_router, AppError, AppResult, AppState, Config};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Stands in for a browser + authenticator pair.
///
/// Options carry a random challenge; a "response" is accepted when it echoes
/// the challenge stored in the ceremony state and came from the expected
/// origin. Counters are whatever the response claims.
pub struct ScriptedRelyingParty;

fn new_challenge() -> String {
    BASE64_URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes())
}

fn check_challenge(rp: &RpIdentity, response: &Value, state: &Value) -> AppResult<()> {
    if response["challenge"] != state["challenge"] {
        return Err(AppError::Verification("challenge mismatch".into()));
    }
    if state["origin"] != json!(rp.origin) {
        return Err(AppError::Verification("origin mismatch".into()));
    }
    Ok(())
}

fn counter_of(response: &Value) -> u32 {
    response["counter"].as_u64().unwrap_or(0) as u32
}

impl RelyingParty for ScriptedRelyingParty {
    fn registration_options(&self, rp: &RpIdentity, user: &UserRecord) -> AppResult<IssuedCeremony> {
        let challenge = new_challenge();
        let exclude: Vec<Value> = user
            .devices
            .iter()
            .map(|d| json!({ "type": "public-key", "id": d.encoded_id() }))
            .collect();

        Ok(IssuedCeremony {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "rp": { "id": rp.id, "name": rp.name },
                    "user": { "id": user.id, "name": user.username },
                    "excludeCredentials": exclude,
                }
            }),
            state: json!({ "challenge": challenge, "origin": rp.origin }),
            challenge,
        })
    }

    fn verify_registration(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
    ) -> AppResult<VerifiedRegistration> {
        check_challenge(rp, response, state)?;
        let id = response["id"]
            .as_str()
            .and_then(|id| BASE64_URL_SAFE_NO_PAD.decode(id).ok())
            .ok_or_else(|| AppError::BadRequest("bad id".into()))?;

        Ok(VerifiedRegistration {
            credential_id: id,
            credential_public_key: b"scripted-public-key".to_vec(),
            counter: counter_of(response),
        })
    }

    fn authentication_options(
        &self,
        rp: &RpIdentity,
        devices: &[DeviceRecord],
    ) -> AppResult<IssuedCeremony> {
        let challenge = new_challenge();
        let allow: Vec<Value> = devices
            .iter()
            .map(|d| json!({ "type": "public-key", "id": d.encoded_id(), "transports": d.transports }))
            .collect();

        Ok(IssuedCeremony {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "rpId": rp.id,
                    "allowCredentials": allow,
                }
            }),
            state: json!({ "challenge": challenge, "origin": rp.origin }),
            challenge,
        })
    }

    fn verify_authentication(
        &self,
        rp: &RpIdentity,
        response: &Value,
        state: &Value,
        device: &DeviceRecord,
    ) -> AppResult<VerifiedAuthentication> {
        check_challenge(rp, response, state)?;

        Ok(VerifiedAuthentication {
            credential_id: device.credential_id.clone(),
            new_counter: counter_of(response),
            credential_public_key: None,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        let state = AppState::from_parts(Config::default(), store, Arc::new(ScriptedRelyingParty));
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::HOST, "localhost:3000")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookie, body)
    }

    pub async fn user(&self, username: &str) -> Option<UserRecord> {
        let raw = self.state.store().get(username).await.unwrap()?;
        Some(serde_json::from_str(&raw).unwrap())
    }

    /// Run registration options + verify for `username` with credential `id`
    pub async fn register(&self, username: &str, credential_id: &[u8]) -> Value {
        let (status, options) = self
            .post("/api/webauthn/register/options", json!({ "username": username }))
            .await;
        assert_eq!(status, StatusCode::OK, "{options}");

        let (status, body) = self
            .post(
                "/api/webauthn/register/verify",
                json!({
                    "username": username,
                    "response": registration_response(credential_id, challenge_of(&options)),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

pub fn challenge_of(options: &Value) -> &str {
    options["publicKey"]["challenge"].as_str().expect("options carry a challenge")
}

pub fn registration_response(credential_id: &[u8], challenge: &str) -> Value {
    json!({
        "id": BASE64_URL_SAFE_NO_PAD.encode(credential_id),
        "challenge": challenge,
        "response": { "transports": ["internal"] },
    })
}

pub fn assertion_response(credential_id: &[u8], challenge: &str, counter: u32) -> Value {
    json!({
        "id": BASE64_URL_SAFE_NO_PAD.encode(credential_id),
        "challenge": challenge,
        "counter": counter,
    })
}
