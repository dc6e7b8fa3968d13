//! # Configuration Management
//!
//! This module handles loading configuration from environment variables.
//! Configuration comes from the environment (optionally seeded by a `.env` file).
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 3000)
//! - `RP_ID`: WebAuthn Relying Party ID (optional, otherwise derived from `Host`)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (optional, otherwise derived from `Host`)
//! - `RP_NAME`: Human-readable name for your service
//! - `CHALLENGE_TTL_SECS`: How long an issued challenge stays usable (default: 300, max: 86400)
//! - `STATIC_DIR`: Directory served as the browser client (default: static)
//! - `STORE_BACKEND`: `memory`, `file`, `redis`, `kv` or `sqlite` (default: memory)
//! - `STORE_PATH`: JSON file used by the `file` backend
//! - `REDIS_URL`: Connection string used by the `redis` backend
//! - `KV_REST_API_URL` / `KV_REST_API_TOKEN`: Hosted REST key-value store (`kv` backend)
//! - `DATABASE_URL`: SQLite connection string used by the `sqlite` backend

use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Username used when a request omits one.
pub const DEFAULT_USERNAME: &str = "demo";

/// Upper bound for `CHALLENGE_TTL_SECS` (one day)
pub const MAX_CHALLENGE_TTL_SECS: u64 = 24 * 60 * 60;

/// Which key-value backend holds the user records
///
/// Every variant carries the connection details it needs, so the store
/// can be built from this value alone.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Process memory. Lost on restart.
    Memory,

    /// A single JSON file mapping username to user record
    File { path: PathBuf },

    /// Redis, keys stored under a fixed prefix
    Redis { url: String },

    /// Hosted key-value store speaking the Upstash/Vercel KV REST protocol
    RestKv { url: String, token: String },

    /// SQLite table of key/value rows
    Sqlite { database_url: String },
}

// Hand-written so the KV token never reaches the logs
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory => f.write_str("Memory"),
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::Redis { url } => f.debug_struct("Redis").field("url", url).finish(),
            StoreConfig::RestKv { url, .. } => f
                .debug_struct("RestKv")
                .field("url", url)
                .field("token", &"<redacted>")
                .finish(),
            StoreConfig::Sqlite { database_url } => f
                .debug_struct("Sqlite")
                .field("database_url", database_url)
                .finish(),
        }
    }
}

/// Application configuration
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: Your application/website that relies on authentication
/// - **RP ID**: Your domain name (e.g., "example.com" or "localhost")
/// - **RP Origin**: Full URL of your application (e.g., "https://example.com")
///
/// `rp_id` and `rp_origin` are optional: when unset they are resolved per
/// request from the `Host` header (see [`crate::webauthn::RpIdentity`]).
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// Fixed WebAuthn Relying Party ID, if configured
    pub rp_id: Option<String>,

    /// Fixed WebAuthn Relying Party Origin, if configured
    pub rp_origin: Option<String>,

    /// Human-readable name for your application
    /// Shown to users during passkey creation
    pub rp_name: String,

    /// Seconds a pending challenge remains valid
    pub challenge_ttl_secs: u64,

    /// Directory holding the browser client
    pub static_dir: PathBuf,

    /// Storage backend for user records
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            rp_id: None,
            rp_origin: None,
            rp_name: "Passkey Demo".to_string(),
            challenge_ttl_secs: 300,
            static_dir: PathBuf::from("static"),
            store: StoreConfig::Memory,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Loads variables from `.env` (if present) using dotenvy, then reads
    /// each value from the process environment, falling back to defaults.
    ///
    /// ## Example .env file
    /// ```text
    /// PORT=3000
    /// RP_ID=localhost
    /// RP_ORIGIN=http://localhost:3000
    /// STORE_BACKEND=redis
    /// REDIS_URL=redis://localhost:6379
    /// ```
    pub fn from_env() -> Result<Self> {
        // dotenvy doesn't error if the file is missing
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        // Empty values count as unset, same as a missing variable
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{port}'"))?,
            None => defaults.port,
        };

        let challenge_ttl_secs = match var("CHALLENGE_TTL_SECS") {
            Some(ttl) => ttl
                .parse()
                .with_context(|| format!("CHALLENGE_TTL_SECS must be a number of seconds, got '{ttl}'"))?,
            None => defaults.challenge_ttl_secs,
        };
        if challenge_ttl_secs > MAX_CHALLENGE_TTL_SECS {
            bail!(
                "CHALLENGE_TTL_SECS must be at most {MAX_CHALLENGE_TTL_SECS} seconds, got {challenge_ttl_secs}"
            );
        }

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "memory".to_string());
        let store = match backend.to_ascii_lowercase().as_str() {
            "memory" => StoreConfig::Memory,
            "file" => StoreConfig::File {
                path: var("STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("users.json")),
            },
            "redis" => StoreConfig::Redis {
                url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            },
            "kv" => StoreConfig::RestKv {
                url: var("KV_REST_API_URL")
                    .ok_or_else(|| anyhow!("KV_REST_API_URL is required for the kv backend"))?,
                token: var("KV_REST_API_TOKEN")
                    .ok_or_else(|| anyhow!("KV_REST_API_TOKEN is required for the kv backend"))?,
            },
            "sqlite" => StoreConfig::Sqlite {
                database_url: var("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite:passkey.db?mode=rwc".to_string()),
            },
            other => bail!("unknown STORE_BACKEND '{other}' (expected memory, file, redis, kv or sqlite)"),
        };

        Ok(Config {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            rp_id: var("RP_ID"),
            rp_origin: var("RP_ORIGIN"),
            rp_name: var("RP_NAME").unwrap_or(defaults.rp_name),
            challenge_ttl_secs,
            static_dir: var("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            store,
        })
    }

    /// Get the socket address to bind the server to
    ///
    /// Example: "127.0.0.1:3000"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Challenge lifetime as a chrono duration
    pub fn challenge_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.challenge_ttl_secs.min(MAX_CHALLENGE_TTL_SECS) as i64)
    }
}
