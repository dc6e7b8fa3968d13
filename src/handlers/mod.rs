//! # HTTP Request Handlers
//!
//! - `health`: Health check endpoint (for monitoring)
//! - `auth`: The four ceremony endpoints plus session info and logout
//! - `users`: Profile of the signed-in user
//!
//! ## Handler Pattern
//! Handlers extract the request, call into `webauthn`/`db`, and return
//! `AppResult<Json<_>>`; `AppError` turns failures into `{ "error": ... }`.

pub mod auth;
pub mod health;
pub mod users;
