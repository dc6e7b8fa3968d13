//! # Middleware Module
//!
//! - `auth`: rejects requests that have no signed-in user in their session

pub mod auth;
