//! API key authentication middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// Characters of a presented key that may appear in logs.
const REDACTED_PREFIX_LEN: usize = 5;

/// Membership check against a static set of API keys.
pub struct KeyAuthenticator {
    header: HeaderName,
    keys: Vec<Vec<u8>>,
}

impl KeyAuthenticator {
    pub fn new(header: HeaderName, keys: &[String]) -> Self {
        Self {
            header,
            keys: keys.iter().map(|k| k.as_bytes().to_vec()).collect(),
        }
    }

    /// Build from config. Falls back to `X-API-Key` if the configured header
    /// name is invalid (validation rejects that case up front).
    pub fn from_config(config: &AuthConfig) -> Self {
        let header = HeaderName::from_bytes(config.header_name.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static("x-api-key"));
        Self::new(header, &config.api_keys)
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// True iff `presented` exactly equals a configured key.
    pub fn authenticate(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        // Compare against every key so timing does not reveal which one matched.
        self.keys
            .iter()
            .fold(subtle::Choice::from(0), |found, key| found | key.as_slice().ct_eq(presented))
            .into()
    }
}

/// Log-safe form of a credential.
pub fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{}...", prefix)
}

/// Middleware function requiring a valid API key header.
pub async fn api_key_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(auth): State<Arc<KeyAuthenticator>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(auth.header())
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(key) if auth.authenticate(key) => next.run(request).await,
        Some(key) => {
            tracing::warn!(
                client = %addr.ip(),
                path = %request.uri().path(),
                key = %redact(key),
                "Invalid API key used"
            );
            metrics::record_rejection("unauthorized");
            ApiError::Unauthorized("Invalid API key").into_response()
        }
        None => {
            tracing::warn!(
                client = %addr.ip(),
                path = %request.uri().path(),
                header = %auth.header(),
                "Missing API key"
            );
            metrics::record_rejection("unauthorized");
            ApiError::Unauthorized("Not authenticated").into_response()
        }
    }
}
