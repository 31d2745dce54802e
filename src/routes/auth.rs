// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth login and session routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::{Config, AUTH_COOKIE_NAME, OAUTH_CALLBACK_PATH, OAUTH_NONCE_COOKIE_NAME};
use crate::crypto::random_hex;
use crate::error::{AppError, Result};
use crate::middleware::auth::{authenticate, presented_token};
use crate::middleware::AuthUser;
use crate::models::user::normalize_email;
use crate::models::{GoogleTokens, User, UserProfile};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
const STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;
const NONCE_BYTES: usize = 16;

/// Routes reachable without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/google/oauth/login", get(oauth_login))
        .route(OAUTH_CALLBACK_PATH, get(oauth_callback))
        .route("/google/oauth/logout", get(logout))
        .route("/api/auth/status", get(auth_status))
}

/// Routes that need a valid session.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/refresh", post(refresh))
}

#[derive(Deserialize)]
pub struct LoginParams {
    /// Frontend to return to. Ignored unless it is an allowed origin.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start OAuth flow - redirect to Google consent.
async fn oauth_login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = params
        .redirect_uri
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| state.config.is_allowed_origin(u))
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let nonce = random_hex(NONCE_BYTES)?;
    let oauth_state = sign_state(
        &frontend_url,
        Utc::now().timestamp_millis(),
        &nonce,
        &state.config.oauth_state_key,
    )?;

    tracing::info!(frontend_url = %frontend_url, "Starting OAuth flow, redirecting to Google");

    let jar = jar.add(nonce_cookie(&state.config, nonce));
    Ok((
        jar,
        Redirect::temporary(&state.google.authorize_url(&oauth_state)),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, upsert user, issue session.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let config = &state.config;
    let verified = params.state.as_deref().and_then(|s| {
        verify_state(s, &config.oauth_state_key, Utc::now().timestamp_millis())
    });
    let cookie_nonce = jar
        .get(OAUTH_NONCE_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .unwrap_or_default();
    let jar = jar.add(expired_nonce_cookie(config));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let frontend_url = verified
            .map(|v| v.frontend_url)
            .unwrap_or_else(|| config.frontend_url.clone());
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let verified = verified.ok_or_else(|| {
        tracing::warn!("Invalid, expired or tampered OAuth state");
        AppError::BadRequest("Invalid OAuth state".to_string())
    })?;

    let nonce_matches = bool::from(cookie_nonce.as_bytes().ct_eq(verified.nonce.as_bytes()));
    if cookie_nonce.is_empty() || !nonce_matches {
        tracing::warn!("OAuth nonce cookie does not match state");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let tokens = state.google.exchange_code(&code).await?;
    let profile = state.google.fetch_profile(&tokens.access_token).await?;

    let email = normalize_email(&profile.email);
    if email.is_empty() {
        return Err(AppError::OAuthProvider(
            "Google profile has no email".to_string(),
        ));
    }

    let now = Utc::now();
    let existing = state.db.get_user(&profile.id).await?;
    let previous_refresh = existing
        .as_ref()
        .and_then(|u| u.tokens.as_ref())
        .and_then(|t| t.refresh_token.clone());

    let user = User {
        id: profile.id,
        email,
        name: profile.name,
        created_at: existing.as_ref().map(|u| u.created_at).unwrap_or(now),
        last_login_at: now,
        tokens: Some(GoogleTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.or(previous_refresh),
            expires_at: now + chrono::Duration::seconds(tokens.expires_in),
        }),
    };
    state.db.upsert_user(&user).await?;

    let session = state.sessions.issue(&user.id).await?;

    tracing::info!(
        user_id = %user.id,
        new_user = existing.is_none(),
        "OAuth successful, session issued"
    );

    let jar = jar.add(session_cookie(config, session.id.clone(), state.sessions.ttl()));
    let redirect = format!(
        "{}/calendar?token={}",
        verified.frontend_url,
        urlencoding::encode(&session.id)
    );
    Ok((jar, Redirect::temporary(&redirect)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Report whether the presented token is a live session.
///
/// Store failures are errors, not "signed out".
async fn auth_status(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>> {
    let user = match presented_token(&jar, &headers) {
        Some(token) => match authenticate(&state, &token).await {
            Ok(user) => Some(UserProfile::from(&user)),
            Err(AppError::InvalidToken) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    Ok(Json(AuthStatusResponse {
        authenticated: user.is_some(),
        user,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RefreshResponse {
    pub token: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub expires_at: DateTime<Utc>,
}

/// Rotate the caller's session token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let session = state.sessions.refresh(&user.token).await?;
    tracing::info!(user_id = %user.user_id, "Session token refreshed");

    let jar = jar.add(session_cookie(
        &state.config,
        session.id.clone(),
        state.sessions.ttl(),
    ));
    Ok((
        jar,
        Json(RefreshResponse {
            token: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

/// Revoke the presented token and clear cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Redirect) {
    if let Some(token) = presented_token(&jar, &headers) {
        match state.sessions.revoke(&token).await {
            Ok(()) => tracing::info!("Session revoked"),
            Err(e) => tracing::warn!(error = %e, "Failed to revoke session on logout"),
        }
    }

    let jar = jar
        .add(expired_session_cookie(&state.config))
        .add(expired_nonce_cookie(&state.config));
    (jar, Redirect::temporary(&state.config.frontend_url))
}

// === Cookies ===

pub(crate) fn session_cookie(
    config: &Config,
    token: String,
    ttl: chrono::Duration,
) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

pub(crate) fn expired_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

fn nonce_cookie(config: &Config, nonce: String) -> Cookie<'static> {
    Cookie::build((OAUTH_NONCE_COOKIE_NAME, nonce))
        .path(OAUTH_CALLBACK_PATH)
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::milliseconds(STATE_MAX_AGE_MS))
        .build()
}

fn expired_nonce_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((OAUTH_NONCE_COOKIE_NAME, ""))
        .path(OAUTH_CALLBACK_PATH)
        .http_only(true)
        .secure(config.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

// === OAuth state ===

/// Decoded contents of a valid OAuth state.
#[derive(Debug, PartialEq)]
struct VerifiedState {
    frontend_url: String,
    nonce: String,
}

fn state_mac(payload: &str, secret: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Sign `frontend_url|timestamp_hex|nonce` and base64url the result.
fn sign_state(frontend_url: &str, now_ms: i64, nonce: &str, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}|{}", frontend_url, now_ms, nonce);
    let signature = state_mac(&payload, secret)?.finalize().into_bytes();
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Check signature and age of an OAuth state.
fn verify_state(state: &str, secret: &[u8], now_ms: i64) -> Option<VerifiedState> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;

    // Split from the right so a '|' inside the URL cannot shift fields.
    let mut parts = decoded.rsplitn(4, '|');
    let signature_hex = parts.next()?;
    let nonce = parts.next()?;
    let timestamp_hex = parts.next()?;
    let frontend_url = parts.next()?;

    let payload = format!("{}|{}|{}", frontend_url, timestamp_hex, nonce);
    let signature = hex::decode(signature_hex).ok()?;
    if state_mac(&payload, secret).ok()?.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now_ms - issued_ms;
    if !(0..=STATE_MAX_AGE_MS).contains(&age) {
        return None;
    }

    Some(VerifiedState {
        frontend_url: frontend_url.to_string(),
        nonce: nonce.to_string(),
    })
}
