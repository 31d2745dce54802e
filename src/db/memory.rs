// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory `Store` for tests and local development.

use crate::db::{ConnectionChange, ConnectionWrite, Store};
use crate::error::AppError;
use crate::models::{AuthToken, Connection, ConnectionRole, ConnectionStatus, DDay, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document store kept in process memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    auth_tokens: Arc<DashMap<String, AuthToken>>,
    ddays: Arc<DashMap<String, DDay>>,
    connections: Arc<DashMap<String, Connection>>,
    /// Serializes multi-document commits.
    commit_lock: Arc<Mutex<()>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

fn collect<T: Clone>(map: &DashMap<String, T>, pred: impl Fn(&T) -> bool) -> Vec<T> {
    map.iter()
        .filter(|entry| pred(entry.value()))
        .map(|entry| entry.value().clone())
        .collect()
}

/// Keep entries matching `keep`; returns how many were dropped.
fn retain_counting<T>(map: &DashMap<String, T>, keep: impl Fn(&T) -> bool) -> usize {
    let mut removed = 0;
    map.retain(|_, value| {
        let kept = keep(value);
        if !kept {
            removed += 1;
        }
        kept
    });
    removed
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(collect(&self.users, |u| u.email == email).into_iter().next())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.users.remove(user_id);
        Ok(())
    }

    async fn get_auth_token(&self, token_id: &str) -> Result<Option<AuthToken>, AppError> {
        Ok(self.auth_tokens.get(token_id).map(|t| t.clone()))
    }

    async fn put_auth_token(&self, token: &AuthToken) -> Result<(), AppError> {
        self.auth_tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn delete_auth_token(&self, token_id: &str) -> Result<(), AppError> {
        self.auth_tokens.remove(token_id);
        Ok(())
    }

    async fn delete_auth_tokens_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        Ok(retain_counting(&self.auth_tokens, |t| t.user_id != user_id))
    }

    async fn delete_expired_auth_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        Ok(retain_counting(&self.auth_tokens, |t| !t.is_expired(now)))
    }

    async fn get_dday(&self, dday_id: &str) -> Result<Option<DDay>, AppError> {
        Ok(self.ddays.get(dday_id).map(|d| d.clone()))
    }

    async fn list_ddays_created_by(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        Ok(collect(&self.ddays, |d| d.created_by == email))
    }

    async fn list_ddays_shared_with(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        Ok(collect(&self.ddays, |d| {
            d.connected_users.iter().any(|u| u == email)
        }))
    }

    async fn put_dday(&self, dday: &DDay) -> Result<(), AppError> {
        self.ddays.insert(dday.id.clone(), dday.clone());
        Ok(())
    }

    async fn delete_dday(&self, dday_id: &str) -> Result<(), AppError> {
        self.ddays.remove(dday_id);
        Ok(())
    }

    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        Ok(self.connections.get(connection_id).map(|c| c.clone()))
    }

    async fn find_connection(
        &self,
        user1: &str,
        user2: &str,
    ) -> Result<Option<Connection>, AppError> {
        Ok(
            collect(&self.connections, |c| c.user1 == user1 && c.user2 == user2)
                .into_iter()
                .next(),
        )
    }

    async fn list_connections(
        &self,
        role: ConnectionRole,
        email: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, AppError> {
        Ok(collect(&self.connections, |c| {
            let participant = match role {
                ConnectionRole::Inviter => &c.user1,
                ConnectionRole::Invitee => &c.user2,
            };
            participant == email && status.map_or(true, |s| c.status == s)
        }))
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), AppError> {
        self.connections
            .insert(connection.id.clone(), connection.clone());
        Ok(())
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AppError> {
        self.connections.remove(connection_id);
        Ok(())
    }

    async fn commit_connection_change(&self, change: &ConnectionChange) -> Result<(), AppError> {
        let _guard = self.commit_lock.lock().await;

        for dday in &change.ddays {
            self.ddays.insert(dday.id.clone(), dday.clone());
        }
        match &change.connection {
            ConnectionWrite::Upsert(connection) => {
                self.connections
                    .insert(connection.id.clone(), connection.clone());
            }
            ConnectionWrite::Delete(connection_id) => {
                self.connections.remove(connection_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(id: &str, user_id: &str, expires_at: DateTime<Utc>) -> AuthToken {
        AuthToken {
            id: id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_delete_expired_tokens_keeps_live_ones() {
        let db = MemoryDb::new();
        let now = Utc::now();
        db.put_auth_token(&token("old", "u1", now - Duration::hours(1)))
            .await
            .unwrap();
        db.put_auth_token(&token("new", "u1", now + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(db.delete_expired_auth_tokens(now).await.unwrap(), 1);
        assert!(db.get_auth_token("old").await.unwrap().is_none());
        assert!(db.get_auth_token("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_tokens_for_user() {
        let db = MemoryDb::new();
        let later = Utc::now() + Duration::hours(1);
        db.put_auth_token(&token("a", "u1", later)).await.unwrap();
        db.put_auth_token(&token("b", "u1", later)).await.unwrap();
        db.put_auth_token(&token("c", "u2", later)).await.unwrap();

        assert_eq!(db.delete_auth_tokens_for_user("u1").await.unwrap(), 2);
        assert!(db.get_auth_token("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repeat_sweeps_count_zero() {
        let db = MemoryDb::new();
        let now = Utc::now();
        db.put_auth_token(&token("old", "u1", now - Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(db.delete_expired_auth_tokens(now).await.unwrap(), 1);
        assert_eq!(db.delete_expired_auth_tokens(now).await.unwrap(), 0);
        assert_eq!(db.delete_auth_tokens_for_user("u1").await.unwrap(), 0);
        assert_eq!(db.delete_auth_tokens_for_user("nobody").await.unwrap(), 0);
    }
}
