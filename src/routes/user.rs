// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account endpoints.

use super::auth::expired_session_cookie;
use super::MessageResponse;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::AppState;
use axum::{extract::State, routing::delete, Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/user", delete(delete_account))
}

/// Delete the caller's account and everything it owns.
///
/// Connections go first so partners' D-Days stop listing this user.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let connections = state.connections.remove_all_for_user(&user.email).await?;
    let ddays = state.ddays.delete_all_created_by(&user.email).await?;
    let tokens = state.db.delete_auth_tokens_for_user(&user.user_id).await?;
    state.db.delete_user(&user.user_id).await?;

    tracing::info!(
        user_id = %user.user_id,
        connections,
        ddays,
        tokens,
        "Account deleted"
    );

    let jar = jar.add(expired_session_cookie(&state.config));
    Ok((
        jar,
        Json(MessageResponse {
            message: "Account deleted".to_string(),
        }),
    ))
}
