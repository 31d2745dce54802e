// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner connection endpoints.

use super::MessageResponse;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::AuthUser;
use crate::models::user::normalize_email;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/connection", get(get_connection))
        .route("/api/connection/invite", post(invite))
        .route("/api/connection/pending", get(pending))
        .route("/api/connection/{id}/accept", post(accept))
        .route("/api/connection/{id}/reject", post(reject))
}

#[derive(Serialize)]
pub struct PartnerInfo {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// `null` when the partner account no longer exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<Option<PartnerInfo>>,
}

/// The caller's active connection and partner.
async fn get_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionResponse>> {
    let Some(connection) = state.connections.get_active(&user.email).await? else {
        return Ok(Json(ConnectionResponse {
            connected: false,
            connection_id: None,
            partner: None,
        }));
    };

    let partner = match connection.partner_of(&user.email) {
        Some(email) => state.db.find_user_by_email(email).await?,
        None => None,
    };

    Ok(Json(ConnectionResponse {
        connected: true,
        connection_id: Some(connection.id),
        partner: Some(partner.map(|p| PartnerInfo {
            id: p.id,
            email: p.email,
            name: p.name,
        })),
    }))
}

#[derive(Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub message: String,
    pub connection_id: String,
}

async fn invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<InviteRequest>,
) -> Result<Json<InviteResponse>> {
    let inviter = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let connection = state
        .connections
        .invite(&inviter, &normalize_email(&body.email))
        .await?;

    Ok(Json(InviteResponse {
        message: "Invitation sent".to_string(),
        connection_id: connection.id,
    }))
}

#[derive(Serialize)]
pub struct InvitationInfo {
    pub id: String,
    pub from_email: String,
    pub from_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub invitations: Vec<InvitationInfo>,
}

/// Invitations waiting on the caller.
async fn pending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PendingResponse>> {
    let invitations = state
        .connections
        .pending_for(&user.email)
        .await?
        .into_iter()
        .map(|i| InvitationInfo {
            id: i.connection_id,
            from_email: i.from_email,
            from_name: i.from_name,
            created_at: i.created_at,
        })
        .collect();

    Ok(Json(PendingResponse { invitations }))
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.connections.accept(&id, &user.email).await?;
    Ok(Json(MessageResponse {
        message: "Connection accepted".to_string(),
    }))
}

/// Reject an invitation or disconnect.
async fn reject(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.connections.reject(&id, &user.email).await?;
    Ok(Json(MessageResponse {
        message: "Connection removed".to_string(),
    }))
}
