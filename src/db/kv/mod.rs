//! # Key-Value Backends
//!
//! User records live in a plain key-value store keyed by username. Every
//! backend implements the same three operations, and all read-modify-write
//! sequences above this layer go through [`KvStore::compare_and_swap`].
//!
//! ## Backends
//! - `memory`: `HashMap` behind a tokio lock
//! - `file`: one JSON document mapping username to record
//! - `redis_kv`: Redis keys under [`KEY_PREFIX`]
//! - `rest`: hosted KV over the Upstash/Vercel REST protocol, same prefix
//! - `sqlite`: `kv_entries` table through an `sqlx` pool

use crate::config::StoreConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod file;
pub mod memory;
pub mod redis_kv;
pub mod rest;
pub mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use redis_kv::RedisStore;
pub use rest::RestKvStore;
pub use sqlite::SqliteKvStore;

/// Prefix for keys in shared external stores (Redis, hosted KV)
pub const KEY_PREFIX: &str = "passkey:user:";

/// Compare-and-swap for Redis-protocol stores. Returns 1 when swapped.
pub(crate) const CAS_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Errors raised by a key-value backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("kv request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The backend answered, but with an error
    #[error("backend: {0}")]
    Backend(String),
}

/// Minimal key-value interface the user store is built on
///
/// Values are JSON documents. `compare_and_swap` writes `new` only if the
/// current value equals `expected` (`None` meaning "key absent") and reports
/// whether it did.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError>;
}

/// Build the configured backend
pub async fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::File { path } => Arc::new(FileStore::new(path.clone())),
        StoreConfig::Redis { url } => Arc::new(RedisStore::connect(url).await?),
        StoreConfig::RestKv { url, token } => Arc::new(RestKvStore::new(url, token)?),
        StoreConfig::Sqlite { database_url } => Arc::new(SqliteKvStore::connect(database_url).await?),
    };

    tracing::info!(backend = store.backend(), "User store ready");
    Ok(store)
}

/// Shared behaviour every backend must satisfy
#[cfg(test)]
pub(crate) async fn exercise_store(store: &dyn KvStore) {
    assert_eq!(store.get("alice").await.unwrap(), None);

    // insert-if-absent
    assert!(store.compare_and_swap("alice", None, r#"{"v":1}"#).await.unwrap());
    assert!(!store.compare_and_swap("alice", None, r#"{"v":9}"#).await.unwrap());

    let current = store.get("alice").await.unwrap().expect("alice stored");
    let parsed: serde_json::Value = serde_json::from_str(&current).unwrap();
    assert_eq!(parsed["v"], 1);

    // stale expectation loses, fresh one wins
    assert!(!store
        .compare_and_swap("alice", Some(r#"{"v":0}"#), r#"{"v":2}"#)
        .await
        .unwrap());
    assert!(store
        .compare_and_swap("alice", Some(&current), r#"{"v":2}"#)
        .await
        .unwrap());

    store.set("bob", r#"{"v":3}"#).await.unwrap();
    let bob: serde_json::Value =
        serde_json::from_str(&store.get("bob").await.unwrap().unwrap()).unwrap();
    assert_eq!(bob["v"], 3);

    // expecting a value on a missing key never inserts
    assert!(!store
        .compare_and_swap("carol", Some(r#"{"v":1}"#), r#"{"v":2}"#)
        .await
        .unwrap());
    assert_eq!(store.get("carol").await.unwrap(), None);
}
