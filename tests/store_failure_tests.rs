// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store outages surface as server errors, never as "signed out".

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use calple::config::Config;
use calple::db::{ConnectionChange, MemoryDb, Store};
use calple::error::AppError;
use calple::models::{AuthToken, Connection, ConnectionRole, ConnectionStatus, DDay, User};
use calple::routes::create_router;
use calple::AppState;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{api_request, body_json};

/// Which lookup should fail.
#[derive(Clone, Copy)]
enum Outage {
    Tokens,
    Users,
}

/// `MemoryDb` whose token or user reads fail.
struct UnavailableDb {
    inner: MemoryDb,
    outage: Outage,
}

fn unavailable() -> AppError {
    AppError::Database("unavailable".to_string())
}

#[async_trait]
impl Store for UnavailableDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match self.outage {
            Outage::Users => Err(unavailable()),
            Outage::Tokens => self.inner.get_user(user_id).await,
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.inner.find_user_by_email(email).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.upsert_user(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.inner.delete_user(user_id).await
    }

    async fn get_auth_token(&self, token_id: &str) -> Result<Option<AuthToken>, AppError> {
        match self.outage {
            Outage::Tokens => Err(unavailable()),
            Outage::Users => self.inner.get_auth_token(token_id).await,
        }
    }

    async fn put_auth_token(&self, token: &AuthToken) -> Result<(), AppError> {
        self.inner.put_auth_token(token).await
    }

    async fn delete_auth_token(&self, token_id: &str) -> Result<(), AppError> {
        self.inner.delete_auth_token(token_id).await
    }

    async fn delete_auth_tokens_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        self.inner.delete_auth_tokens_for_user(user_id).await
    }

    async fn delete_expired_auth_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        self.inner.delete_expired_auth_tokens(now).await
    }

    async fn get_dday(&self, dday_id: &str) -> Result<Option<DDay>, AppError> {
        self.inner.get_dday(dday_id).await
    }

    async fn list_ddays_created_by(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        self.inner.list_ddays_created_by(email).await
    }

    async fn list_ddays_shared_with(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        self.inner.list_ddays_shared_with(email).await
    }

    async fn put_dday(&self, dday: &DDay) -> Result<(), AppError> {
        self.inner.put_dday(dday).await
    }

    async fn delete_dday(&self, dday_id: &str) -> Result<(), AppError> {
        self.inner.delete_dday(dday_id).await
    }

    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        self.inner.get_connection(connection_id).await
    }

    async fn find_connection(
        &self,
        user1: &str,
        user2: &str,
    ) -> Result<Option<Connection>, AppError> {
        self.inner.find_connection(user1, user2).await
    }

    async fn list_connections(
        &self,
        role: ConnectionRole,
        email: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, AppError> {
        self.inner.list_connections(role, email, status).await
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), AppError> {
        self.inner.put_connection(connection).await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AppError> {
        self.inner.delete_connection(connection_id).await
    }

    async fn commit_connection_change(&self, change: &ConnectionChange) -> Result<(), AppError> {
        self.inner.commit_connection_change(change).await
    }
}

/// App over a store with `outage`, plus a token whose records exist.
async fn app_with_outage(outage: Outage) -> (axum::Router, String) {
    let inner = MemoryDb::new();
    let now = Utc::now();
    inner
        .upsert_user(&User {
            id: "a".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            created_at: now,
            last_login_at: now,
            tokens: None,
        })
        .await
        .unwrap();
    inner
        .put_auth_token(&AuthToken {
            id: "live-token".to_string(),
            user_id: "a".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        })
        .await
        .unwrap();

    let state = AppState::new(Config::test_default(), Arc::new(UnavailableDb { inner, outage }));
    (create_router(Arc::new(state)), "live-token".to_string())
}

#[tokio::test]
async fn test_protected_route_store_failure_is_server_error() {
    for outage in [Outage::Tokens, Outage::Users] {
        let (app, token) = app_with_outage(outage).await;

        let response = app
            .oneshot(api_request(Method::GET, "/api/ddays", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "database_error");
    }
}

#[tokio::test]
async fn test_auth_status_store_failure_is_server_error() {
    let (app, token) = app_with_outage(Outage::Tokens).await;

    let response = app
        .oneshot(api_request(Method::GET, "/api/auth/status", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_missing_token_still_unauthorized_during_outage() {
    let (app, _) = app_with_outage(Outage::Tokens).await;

    let response = app
        .oneshot(api_request(Method::GET, "/api/ddays", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
