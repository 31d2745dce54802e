// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the `Store` operations for:
//! - Users (profile and Google token bundle)
//! - Auth tokens (opaque session tokens)
//! - D-Days (calendar milestones)
//! - Connections (pairing between two users)

use crate::db::{collections, ConnectionChange, ConnectionWrite, Store};
use crate::error::AppError;
use crate::models::{AuthToken, Connection, ConnectionRole, ConnectionStatus, DDay, User};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn get_by_id<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, ids: &[String], collection: &str) -> Result<(), AppError> {
        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                self.client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_by_id(collections::USERS, user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.put(collections::USERS, &user.id, user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.delete_by_id(collections::USERS, user_id).await
    }

    // ─── Auth Token Operations ───────────────────────────────────

    async fn get_auth_token(&self, token_id: &str) -> Result<Option<AuthToken>, AppError> {
        self.get_by_id(collections::AUTH_TOKENS, token_id).await
    }

    async fn put_auth_token(&self, token: &AuthToken) -> Result<(), AppError> {
        self.put(collections::AUTH_TOKENS, &token.id, token).await
    }

    async fn delete_auth_token(&self, token_id: &str) -> Result<(), AppError> {
        self.delete_by_id(collections::AUTH_TOKENS, token_id).await
    }

    async fn delete_auth_tokens_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        let tokens: Vec<AuthToken> = self
            .client
            .fluent()
            .select()
            .from(collections::AUTH_TOKENS)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ids: Vec<String> = tokens.into_iter().map(|t| t.id).collect();
        self.batch_delete(&ids, collections::AUTH_TOKENS).await?;
        Ok(ids.len())
    }

    async fn delete_expired_auth_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        // expiresAt is stored as fixed-width RFC3339, so string order is time order
        let cutoff = format_utc_rfc3339(now);
        let tokens: Vec<AuthToken> = self
            .client
            .fluent()
            .select()
            .from(collections::AUTH_TOKENS)
            .filter(|q| q.for_all([q.field("expiresAt").less_than_or_equal(cutoff.as_str())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ids: Vec<String> = tokens.into_iter().map(|t| t.id).collect();
        self.batch_delete(&ids, collections::AUTH_TOKENS).await?;
        Ok(ids.len())
    }

    // ─── D-Day Operations ────────────────────────────────────────

    async fn get_dday(&self, dday_id: &str) -> Result<Option<DDay>, AppError> {
        self.get_by_id(collections::DDAYS, dday_id).await
    }

    async fn list_ddays_created_by(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::DDAYS)
            .filter(|q| q.for_all([q.field("createdBy").eq(email)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_ddays_shared_with(&self, email: &str) -> Result<Vec<DDay>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::DDAYS)
            .filter(|q| q.for_all([q.field("connectedUsers").array_contains(email)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_dday(&self, dday: &DDay) -> Result<(), AppError> {
        self.put(collections::DDAYS, &dday.id, dday).await
    }

    async fn delete_dday(&self, dday_id: &str) -> Result<(), AppError> {
        self.delete_by_id(collections::DDAYS, dday_id).await
    }

    // ─── Connection Operations ───────────────────────────────────

    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        self.get_by_id(collections::CONNECTIONS, connection_id).await
    }

    async fn find_connection(
        &self,
        user1: &str,
        user2: &str,
    ) -> Result<Option<Connection>, AppError> {
        let found: Vec<Connection> = self
            .client
            .fluent()
            .select()
            .from(collections::CONNECTIONS)
            .filter(|q| {
                q.for_all([q.field("user1").eq(user1), q.field("user2").eq(user2)])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.into_iter().next())
    }

    async fn list_connections(
        &self,
        role: ConnectionRole,
        email: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::CONNECTIONS)
            .filter(|q| {
                q.for_all([
                    q.field(role.field()).eq(email),
                    status.and_then(|s| q.field("status").eq(s.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), AppError> {
        self.put(collections::CONNECTIONS, &connection.id, connection)
            .await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AppError> {
        self.delete_by_id(collections::CONNECTIONS, connection_id)
            .await
    }

    // ─── Atomic Connection Fan-out ───────────────────────────────

    /// Commit a connection change with its D-Day rewrites.
    ///
    /// Fits in a single transaction unless more than `BATCH_SIZE` D-Days are
    /// touched; then D-Days are committed in chunks and the connection write
    /// rides in the final chunk, so the connection never changes state
    /// unless every D-Day write before it landed.
    async fn commit_connection_change(&self, change: &ConnectionChange) -> Result<(), AppError> {
        let mut chunks: Vec<&[DDay]> = change.ddays.chunks(BATCH_SIZE - 1).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for dday in chunk {
                self.client
                    .fluent()
                    .update()
                    .in_col(collections::DDAYS)
                    .document_id(&dday.id)
                    .object(dday)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add D-Day to transaction: {}", e))
                    })?;
            }

            if i == last {
                match &change.connection {
                    ConnectionWrite::Upsert(connection) => {
                        self.client
                            .fluent()
                            .update()
                            .in_col(collections::CONNECTIONS)
                            .document_id(&connection.id)
                            .object(connection)
                            .add_to_transaction(&mut transaction)
                    }
                    ConnectionWrite::Delete(connection_id) => self
                        .client
                        .fluent()
                        .delete()
                        .from(collections::CONNECTIONS)
                        .document_id(connection_id)
                        .add_to_transaction(&mut transaction),
                }
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add connection to transaction: {}",
                        e
                    ))
                })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        }

        tracing::debug!(
            ddays = change.ddays.len(),
            "Connection change committed"
        );

        Ok(())
    }
}
