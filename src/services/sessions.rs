// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tokens: issue, resolve, rotate, revoke, sweep.
//!
//! Tokens are opaque random hex strings stored in `auth_tokens`. Clients
//! present them as the `calple_token` cookie or as a bearer token.

use crate::crypto::{random_hex, TOKEN_BYTES};
use crate::db::Db;
use crate::error::AppError;
use crate::models::AuthToken;
use chrono::{Duration, Utc};
use std::time::Duration as StdDuration;

/// Issues and validates session tokens.
#[derive(Clone)]
pub struct SessionService {
    db: Db,
    ttl: Duration,
}

impl SessionService {
    pub fn new(db: Db, ttl_hours: i64) -> Self {
        Self {
            db,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Token lifetime, for cookie `Max-Age`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create and store a fresh token for `user_id`.
    pub async fn issue(&self, user_id: &str) -> Result<AuthToken, AppError> {
        let now = Utc::now();
        let token = AuthToken {
            id: random_hex(TOKEN_BYTES)?,
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.db.put_auth_token(&token).await?;
        tracing::debug!(user_id, "Issued auth token");
        Ok(token)
    }

    /// Resolve a presented token to its record.
    ///
    /// Expired tokens are deleted on sight.
    pub async fn resolve(&self, token_id: &str) -> Result<AuthToken, AppError> {
        if token_id.is_empty() {
            return Err(AppError::InvalidToken);
        }
        let token = self
            .db
            .get_auth_token(token_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if token.is_expired(Utc::now()) {
            tracing::debug!(user_id = %token.user_id, "Rejecting expired auth token");
            self.db.delete_auth_token(&token.id).await?;
            return Err(AppError::InvalidToken);
        }
        Ok(token)
    }

    /// Swap a valid token for a new one. The old token stops working.
    pub async fn refresh(&self, token_id: &str) -> Result<AuthToken, AppError> {
        let current = self.resolve(token_id).await?;
        self.db.delete_auth_token(&current.id).await?;
        self.issue(&current.user_id).await
    }

    /// Delete a token (logout). Unknown tokens are ignored.
    pub async fn revoke(&self, token_id: &str) -> Result<(), AppError> {
        self.db.delete_auth_token(token_id).await
    }

    /// Delete every token past its expiry.
    pub async fn sweep_expired(&self) -> Result<usize, AppError> {
        self.db.delete_expired_auth_tokens(Utc::now()).await
    }

    /// Run `sweep_expired` every `interval` until the runtime shuts down.
    pub fn spawn_sweeper(self, interval: StdDuration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.sweep_expired().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Swept expired auth tokens"),
                    Err(e) => tracing::warn!(error = %e, "Auth token sweep failed"),
                }
            }
        })
    }
}
