// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: a typed document store with Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{AuthToken, Connection, ConnectionRole, ConnectionStatus, DDay, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const AUTH_TOKENS: &str = "auth_tokens";
    pub const DDAYS: &str = "ddays";
    pub const CONNECTIONS: &str = "connections";
}

/// Shared handle to the configured store.
pub type Db = Arc<dyn Store>;

/// Connection state change plus the D-Day rewrites it implies.
///
/// Backends apply the whole change together, or nothing of it.
#[derive(Debug, Clone)]
pub struct ConnectionChange {
    pub connection: ConnectionWrite,
    /// D-Days whose `connectedUsers` changed (full documents).
    pub ddays: Vec<DDay>,
}

#[derive(Debug, Clone)]
pub enum ConnectionWrite {
    Upsert(Connection),
    Delete(String),
}

/// Typed operations over the document store.
#[async_trait]
pub trait Store: Send + Sync {
    // === Users ===

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Look up a user by (normalized) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user document.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;

    // === Auth tokens ===

    async fn get_auth_token(&self, token_id: &str) -> Result<Option<AuthToken>, AppError>;

    async fn put_auth_token(&self, token: &AuthToken) -> Result<(), AppError>;

    async fn delete_auth_token(&self, token_id: &str) -> Result<(), AppError>;

    /// Delete every token owned by a user. Returns how many were removed.
    async fn delete_auth_tokens_for_user(&self, user_id: &str) -> Result<usize, AppError>;

    /// Delete tokens that expired at or before `now`. Returns how many were removed.
    async fn delete_expired_auth_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError>;

    // === D-Days ===

    async fn get_dday(&self, dday_id: &str) -> Result<Option<DDay>, AppError>;

    async fn list_ddays_created_by(&self, email: &str) -> Result<Vec<DDay>, AppError>;

    /// D-Days whose `connectedUsers` contains `email`.
    async fn list_ddays_shared_with(&self, email: &str) -> Result<Vec<DDay>, AppError>;

    /// Create or replace a D-Day document.
    async fn put_dday(&self, dday: &DDay) -> Result<(), AppError>;

    async fn delete_dday(&self, dday_id: &str) -> Result<(), AppError>;

    // === Connections ===

    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError>;

    /// Connection with exactly this inviter and invitee, any status.
    async fn find_connection(
        &self,
        user1: &str,
        user2: &str,
    ) -> Result<Option<Connection>, AppError>;

    /// Connections where `email` plays `role`, optionally filtered by status.
    async fn list_connections(
        &self,
        role: ConnectionRole,
        email: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, AppError>;

    async fn put_connection(&self, connection: &Connection) -> Result<(), AppError>;

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AppError>;

    /// Apply a connection change and its D-Day fan-out together.
    async fn commit_connection_change(&self, change: &ConnectionChange) -> Result<(), AppError>;
}
