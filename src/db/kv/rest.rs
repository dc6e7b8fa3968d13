//! # Hosted KV Backend
//!
//! Talks to a hosted Redis-compatible store over its REST interface
//! (Upstash / Vercel KV). Each command is POSTed as a JSON array, e.g.
//! `["GET", "passkey:user:alice"]`, with a bearer token, and the reply is
//! `{"result": ...}` or `{"error": "..."}`.

use super::{KvStore, StoreError, CAS_SCRIPT, KEY_PREFIX};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

#[derive(Clone)]
pub struct RestKvStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(url: &str, token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client for KV store")?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn key(username: &str) -> String {
        format!("{}{}", KEY_PREFIX, username)
    }

    async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        let reply: RestReply = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?
            .json()
            .await?;

        match reply.error {
            Some(error) => Err(StoreError::Backend(error)),
            None => Ok(reply.result),
        }
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    fn backend(&self) -> &'static str {
        "kv"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = Self::key(key);
        match self.command(&["GET", key.as_str()]).await? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            other => Err(StoreError::Backend(format!("unexpected GET reply: {other}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = Self::key(key);
        self.command(&["SET", key.as_str(), value]).await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let key = Self::key(key);
        let reply = match expected {
            None => self.command(&["SET", key.as_str(), new, "NX"]).await?,
            Some(expected) => {
                self.command(&["EVAL", CAS_SCRIPT, "1", key.as_str(), expected, new])
                    .await?
            }
        };

        Ok(swapped(&reply))
    }
}

/// `SET NX` answers "OK" or null, the CAS script answers 1 or 0
fn swapped(reply: &Value) -> bool {
    match reply {
        Value::String(ok) => ok.eq_ignore_ascii_case("OK"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}
