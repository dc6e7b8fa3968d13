//! # Passkey KV Server
//!
//! A small WebAuthn/passkey server. Four JSON endpoints run the registration
//! and login ceremonies through `webauthn-rs`; user records live in a
//! pluggable key-value store (memory, JSON file, Redis, hosted REST KV or
//! SQLite) and every record update is an atomic compare-and-swap.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod webauthn;

pub use app::build_router;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
