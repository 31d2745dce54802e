// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-token authentication middleware.

use crate::config::AUTH_COOKIE_NAME;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    /// The token the caller presented
    pub token: String,
}

/// Token presented by the client: `calple_token` cookie first, then
/// `Authorization: Bearer`.
pub fn presented_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a token to its live user.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let record = state.sessions.resolve(token).await?;
    state
        .db
        .get_user(&record.user_id)
        .await?
        .ok_or(AppError::InvalidToken)
}

/// Middleware that requires a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;

    let user = authenticate(&state, &token).await?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        email: user.email,
        name: user.name,
        token,
    });

    Ok(next.run(request).await)
}
