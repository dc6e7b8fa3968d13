mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::*;
use passkey_kv_server::db::kv::{KvStore, StoreError};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn fresh_user_gets_registration_options() {
    let app = TestApp::new();

    let (status, options) = app
        .post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!challenge_of(&options).is_empty());
    assert_eq!(options["publicKey"]["rp"]["id"], "localhost");

    let user = app.user("alice").await.expect("user created on first options request");
    let pending = user.current_challenge.expect("challenge stored");
    assert_eq!(pending.challenge, challenge_of(&options));
}

#[tokio::test]
async fn missing_username_uses_demo() {
    let app = TestApp::new();

    let (status, options) = app.post("/api/webauthn/register/options", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["publicKey"]["user"]["name"], "demo");
    assert!(app.user("demo").await.is_some());
}

#[tokio::test]
async fn registration_without_issued_challenge_fails() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/webauthn/register/verify",
            json!({
                "username": "alice",
                "response": registration_response(b"cred-1", "never-issued"),
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No registration in progress.");
}

#[tokio::test]
async fn verified_registration_adds_exactly_one_device() {
    let app = TestApp::new();

    let body = app.register("alice", b"cred-1").await;
    assert_eq!(body, json!({ "verified": true }));

    let user = app.user("alice").await.unwrap();
    assert_eq!(user.devices.len(), 1);
    assert_eq!(user.devices[0].credential_id, b"cred-1".to_vec());
    assert_eq!(user.devices[0].transports, Some(vec!["internal".to_string()]));
    assert!(user.current_challenge.is_none());
}

#[tokio::test]
async fn second_registration_excludes_first_credential() {
    let app = TestApp::new();
    app.register("alice", b"cred-1").await;

    let (status, options) = app
        .post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["publicKey"]["excludeCredentials"][0]["id"], "Y3JlZC0x");

    app.post(
        "/api/webauthn/register/verify",
        json!({
            "username": "alice",
            "response": registration_response(b"cred-2", challenge_of(&options)),
        }),
    )
    .await;

    let user = app.user("alice").await.unwrap();
    assert_eq!(user.devices.len(), 2);
}

#[tokio::test]
async fn failed_registration_still_clears_challenge() {
    let app = TestApp::new();
    app.post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;

    let (status, _) = app
        .post(
            "/api/webauthn/register/verify",
            json!({
                "username": "alice",
                "response": registration_response(b"cred-1", "wrong"),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = app.user("alice").await.unwrap();
    assert!(user.current_challenge.is_none());
    assert!(user.devices.is_empty());
}

#[tokio::test]
async fn stale_challenge_fails_after_reissue() {
    let app = TestApp::new();

    let (_, first) = app
        .post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;
    let (_, second) = app
        .post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;
    assert_ne!(challenge_of(&first), challenge_of(&second));

    let (status, body) = app
        .post(
            "/api/webauthn/register/verify",
            json!({
                "username": "alice",
                "response": registration_response(b"cred-1", challenge_of(&first)),
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("challenge mismatch"));
    assert!(app.user("alice").await.unwrap().devices.is_empty());
}

#[tokio::test]
async fn login_options_require_a_registered_passkey() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/webauthn/login/options", json!({ "username": "nobody" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No passkey registered.");

    // a user who only requested registration options has zero devices
    app.post("/api/webauthn/register/options", json!({ "username": "alice" }))
        .await;
    let (status, body) = app
        .post("/api/webauthn/login/options", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No passkey registered.");
}

#[tokio::test]
async fn verified_login_updates_counter_and_clears_challenge() {
    let app = TestApp::new();
    app.register("alice", b"cred-1").await;

    let (status, options) = app
        .post("/api/webauthn/login/options", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["publicKey"]["allowCredentials"][0]["id"], "Y3JlZC0x");

    let (status, body) = app
        .post(
            "/api/webauthn/login/verify",
            json!({
                "username": "alice",
                "response": assertion_response(b"cred-1", challenge_of(&options), 7),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "verified": true }));

    let user = app.user("alice").await.unwrap();
    assert_eq!(user.devices[0].counter, 7);
    assert!(user.current_challenge.is_none());
}

#[tokio::test]
async fn login_with_unknown_device_fails() {
    let app = TestApp::new();
    app.register("alice", b"cred-1").await;

    let (_, options) = app
        .post("/api/webauthn/login/options", json!({ "username": "alice" }))
        .await;
    let (status, body) = app
        .post(
            "/api/webauthn/login/verify",
            json!({
                "username": "alice",
                "response": assertion_response(b"other", challenge_of(&options), 1),
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Device not found.");
    assert!(app.user("alice").await.unwrap().current_challenge.is_none());
}

#[tokio::test]
async fn login_without_challenge_fails() {
    let app = TestApp::new();
    app.register("alice", b"cred-1").await;

    let (status, body) = app
        .post(
            "/api/webauthn/login/verify",
            json!({
                "username": "alice",
                "response": assertion_response(b"cred-1", "none", 1),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No login in progress.");
}

#[tokio::test]
async fn counter_regression_is_rejected() {
    let app = TestApp::new();
    app.register("alice", b"cred-1").await;

    for (counter, expected) in [(5, StatusCode::OK), (5, StatusCode::BAD_REQUEST)] {
        let (_, options) = app
            .post("/api/webauthn/login/options", json!({ "username": "alice" }))
            .await;
        let (status, body) = app
            .post(
                "/api/webauthn/login/verify",
                json!({
                    "username": "alice",
                    "response": assertion_response(b"cred-1", challenge_of(&options), counter),
                }),
            )
            .await;
        assert_eq!(status, expected, "{body}");
    }

    assert_eq!(app.user("alice").await.unwrap().devices[0].counter, 5);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/webauthn/register/options")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

struct UnreachableStore;

#[async_trait]
impl KvStore for UnreachableStore {
    fn backend(&self) -> &'static str {
        "unreachable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: Option<&str>,
        _new: &str,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

#[tokio::test]
async fn storage_outage_is_not_reported_as_missing_user() {
    let app = TestApp::with_store(Arc::new(UnreachableStore));

    let (status, body) = app
        .post("/api/webauthn/login/options", json!({ "username": "alice" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Storage error");
}
