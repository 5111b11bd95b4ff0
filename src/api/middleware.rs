//! API-key authentication and caller identity resolution.
//!
//! The auth collaborator is deliberately narrow: each configured bearer
//! token maps to a staff caller UUID, and the middleware's only output is
//! that verified identity, inserted into request extensions. Handlers use
//! it as `created_by` and for the creator-only agent deletion rule. With no
//! tokens configured (local development) every request runs as a fixed
//! local-operator identity.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The identity every request runs as when authentication is disabled.
pub const LOCAL_OPERATOR: Uuid = Uuid::nil();

/// Verified caller identity, resolved by [`auth_middleware`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller(pub Uuid);

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Bearer token -> caller identity (from LEADLINE_API_KEYS).
    /// Empty means authentication is disabled.
    api_keys: HashMap<String, Uuid>,
    /// Allowed CORS origins (from LEADLINE_CORS_ORIGINS, comma-separated).
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    /// Load security configuration from environment variables.
    ///
    /// `LEADLINE_API_KEYS` holds comma-separated `token=caller-uuid` pairs;
    /// entries that do not parse are skipped with a warning.
    pub fn from_env() -> Self {
        let api_keys = std::env::var("LEADLINE_API_KEYS")
            .ok()
            .map(|raw| parse_api_keys(&raw))
            .unwrap_or_default();

        let cors_origins = std::env::var("LEADLINE_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            api_keys,
            cors_origins,
        }
    }

    /// Create a config with no authentication (for local development/testing).
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a config with one token mapped to a caller (for testing).
    pub fn with_api_key(token: impl Into<String>, caller: Uuid) -> Self {
        let mut config = Self::default();
        config.add_api_key(token, caller);
        config
    }

    /// Register an additional token -> caller mapping.
    pub fn add_api_key(&mut self, token: impl Into<String>, caller: Uuid) {
        self.api_keys.insert(token.into(), caller);
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    fn resolve(&self, token: &str) -> Option<Uuid> {
        self.api_keys.get(token).copied()
    }
}

fn parse_api_keys(raw: &str) -> HashMap<String, Uuid> {
    let mut keys = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.split_once('=') {
            Some((token, caller)) if !token.trim().is_empty() => {
                match caller.trim().parse::<Uuid>() {
                    Ok(caller) => {
                        keys.insert(token.trim().to_string(), caller);
                    }
                    Err(_) => tracing::warn!("Skipping API key with invalid caller UUID"),
                }
            }
            _ => tracing::warn!("Skipping malformed API key entry"),
        }
    }
    keys
}

/// Authentication middleware that resolves the caller identity.
///
/// Rejects with 401 when authentication is enabled and the bearer token is
/// missing or unknown; otherwise inserts [`Caller`] into request extensions
/// and continues.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if !config.auth_enabled() {
        request.extensions_mut().insert(Caller(LOCAL_OPERATOR));
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            let token = &header[7..];
            match config.resolve(token) {
                Some(caller) => {
                    request.extensions_mut().insert(Caller(caller));
                    Ok(next.run(request).await)
                }
                None => {
                    tracing::warn!("Invalid API key provided");
                    Err(StatusCode::UNAUTHORIZED)
                }
            }
        }
        Some(_) => {
            tracing::warn!("Invalid Authorization header format");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
