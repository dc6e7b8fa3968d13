//! # Storage Module
//!
//! - `kv`: the key-value backends and the [`kv::KvStore`] trait
//! - `models`: the stored structures (user, device, pending challenge)
//! - `users`: reading, creating and atomically updating user records
//! - `credentials`: adding passkeys and recording signature counters
//! - `challenges`: saving and taking the pending WebAuthn challenge

pub mod challenges;
pub mod credentials;
pub mod kv;
pub mod models;
pub mod users;
