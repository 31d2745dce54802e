// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use axum::http::Uri;
use std::env;

/// Session cookie carrying the auth token.
pub const AUTH_COOKIE_NAME: &str = "calple_token";
/// Cookie binding an OAuth `state` to the browser that started the flow.
pub const OAUTH_NONCE_COOKIE_NAME: &str = "calple_oauth_nonce";
/// Path of the OAuth callback route.
pub const OAUTH_CALLBACK_PATH: &str = "/google/oauth/callback";

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Public base URL of this API (used for the OAuth redirect URI)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Lifetime of issued auth tokens
    pub auth_token_ttl_hours: i64,
    /// Seconds between expired-token sweeps (0 disables)
    pub token_sweep_interval_secs: u64,
    pub store_backend: StoreBackend,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for signing OAuth state (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            auth_token_ttl_hours: env::var("AUTH_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|hours: &i64| *hours > 0)
                .unwrap_or(30 * 24),
            token_sweep_interval_secs: env::var("TOKEN_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            store_backend,

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:5000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 5000,
            auth_token_ttl_hours: 24,
            token_sweep_interval_secs: 0,
            store_backend: StoreBackend::Memory,
            google_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Redirect URI registered with Google.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}{}", self.api_url, OAUTH_CALLBACK_PATH)
    }

    /// Whether `origin` may receive credentials and OAuth redirects.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        origin == self.frontend_url || is_local_dev_origin(origin)
    }

    /// Cookies are `Secure` unless the frontend runs on plain-HTTP localhost.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// `http://localhost[:port]` or `http://127.0.0.1[:port]`, nothing more.
fn is_local_dev_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    let Some(authority) = uri.authority() else {
        return false;
    };

    let host = authority.host();
    let exact_authority = match authority.port_u16() {
        Some(port) => authority.as_str() == format!("{host}:{port}"),
        None => authority.as_str() == host,
    };

    uri.scheme_str() == Some("http")
        && exact_authority
        && matches!(host, "localhost" | "127.0.0.1")
        && matches!(uri.path(), "" | "/")
        && uri.query().is_none()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
