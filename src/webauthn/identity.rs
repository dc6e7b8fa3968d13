//! # Relying Party Identity
//!
//! Resolves the RP ID and expected origin for a request. Configured values
//! win; otherwise both are derived from the `Host` header, so the demo works
//! unchanged on localhost and behind a real domain.

use crate::config::Config;

/// Fallbacks when neither configuration nor a `Host` header is available
const FALLBACK_RP_ID: &str = "localhost";
const FALLBACK_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpIdentity {
    /// Relying party id, a bare domain ("example.com")
    pub id: String,

    /// Expected origin including scheme ("https://example.com")
    pub origin: String,

    /// Display name shown during passkey creation
    pub name: String,
}

impl RpIdentity {
    /// Resolve the identity for a request with the given `Host` header
    ///
    /// - RP ID: `RP_ID`, else the host without its port, else `localhost`
    /// - Origin: `RP_ORIGIN`, else `http://` for localhost/127.0.0.1 hosts and
    ///   `https://` otherwise, else `http://localhost:3000`
    pub fn resolve(config: &Config, host: Option<&str>) -> Self {
        let host = host.map(str::trim).filter(|h| !h.is_empty());

        let id = match (&config.rp_id, host) {
            (Some(id), _) => id.clone(),
            (None, Some(host)) => strip_port(host).to_string(),
            (None, None) => FALLBACK_RP_ID.to_string(),
        };

        let origin = match (&config.rp_origin, host) {
            (Some(origin), _) => origin.clone(),
            (None, Some(host)) => {
                let scheme = if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
                    "http"
                } else {
                    "https"
                };
                format!("{}://{}", scheme, host)
            }
            (None, None) => FALLBACK_ORIGIN.to_string(),
        };

        Self {
            id,
            origin,
            name: config.rp_name.clone(),
        }
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literal, e.g. "[::1]:3000"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}
