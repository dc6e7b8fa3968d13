//! # Redis Backend
//!
//! Records are stored as JSON strings at `passkey:user:{username}`.
//! Insert-if-absent uses `SET NX`; compare-and-swap runs [`CAS_SCRIPT`]
//! server-side so the comparison and the write are one atomic step.

use super::{KvStore, StoreError, CAS_SCRIPT, KEY_PREFIX};
use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    cas: Script,
}

impl RedisStore {
    /// Open a managed connection (reconnects on its own after failures)
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL {}", url))?;
        let conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", url))?;

        Ok(Self {
            conn,
            cas: Script::new(CAS_SCRIPT),
        })
    }

    fn key(username: &str) -> String {
        format!("{}{}", KEY_PREFIX, username)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(Self::key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(Self::key(key), value).await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let key = Self::key(key);

        match expected {
            None => {
                let reply: Option<String> = redis::cmd("SET")
                    .arg(&key)
                    .arg(new)
                    .arg("NX")
                    .query_async(&mut conn)
                    .await?;
                Ok(reply.is_some())
            }
            Some(expected) => {
                let swapped: i64 = self
                    .cas
                    .key(&key)
                    .arg(expected)
                    .arg(new)
                    .invoke_async(&mut conn)
                    .await?;
                Ok(swapped == 1)
            }
        }
    }
}
