//! # Application State
//!
//! The shared state every request handler receives. Axum clones it per
//! request, so everything inside is behind an `Arc`.

use crate::config::Config;
use crate::db::kv::{self, KvStore};
use crate::webauthn::{PasskeyRelyingParty, RelyingParty};
use anyhow::Result;
use std::sync::Arc;

/// Shared application state
///
/// - `store`: the key-value backend holding user records
/// - `relying_party`: the WebAuthn library boundary
/// - `config`: resolved configuration (RP overrides, challenge TTL)
///
/// Handlers never reach for globals; tests build this with an in-memory
/// store and a scripted relying party.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn KvStore>,
    pub relying_party: Arc<dyn RelyingParty>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Initialize application state from configuration
    ///
    /// Connects the configured store backend and sets up the webauthn-rs
    /// relying party.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached (Redis down,
    /// SQLite migrations failing, bad KV client configuration).
    pub async fn new(config: &Config) -> Result<Self> {
        let store = kv::connect(&config.store).await?;

        Ok(Self::from_parts(
            config.clone(),
            store,
            Arc::new(PasskeyRelyingParty::new()),
        ))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: Config,
        store: Arc<dyn KvStore>,
        relying_party: Arc<dyn RelyingParty>,
    ) -> Self {
        Self {
            store,
            relying_party,
            config: Arc::new(config),
        }
    }

    /// The key-value backend holding user records
    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }
}
