// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connection lifecycle: invite, accept, reject/disconnect.
//!
//! Accepting or removing a connection rewrites `connectedUsers` on every
//! D-Day either participant created. The rewrite and the connection change
//! go to the store as one [`ConnectionChange`].

use crate::crypto::new_doc_id;
use crate::db::{ConnectionChange, ConnectionWrite, Db};
use crate::error::AppError;
use crate::models::{Connection, ConnectionRole, ConnectionStatus, DDay, User};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt, TryStreamExt};

/// Concurrent user lookups when listing invitations.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// A pending invitation addressed to the caller.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub connection_id: String,
    pub from_email: String,
    /// Empty if the inviter's account is gone
    pub from_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConnectionService {
    db: Db,
}

impl ConnectionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The caller's active connection, checking the inviter side first.
    pub async fn get_active(&self, email: &str) -> Result<Option<Connection>, AppError> {
        for role in [ConnectionRole::Inviter, ConnectionRole::Invitee] {
            let mut found = self
                .db
                .list_connections(role, email, Some(ConnectionStatus::Active))
                .await?;
            if !found.is_empty() {
                return Ok(Some(found.swap_remove(0)));
            }
        }
        Ok(None)
    }

    /// Email of the caller's active partner, if any.
    pub async fn active_partner(&self, email: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .get_active(email)
            .await?
            .and_then(|c| c.partner_of(email).map(str::to_string)))
    }

    /// Pending invitations where the caller is the invitee.
    pub async fn pending_for(&self, email: &str) -> Result<Vec<Invitation>, AppError> {
        let pending = self
            .db
            .list_connections(ConnectionRole::Invitee, email, Some(ConnectionStatus::Pending))
            .await?;

        stream::iter(pending)
            .map(|conn| async move {
                let inviter = self.db.find_user_by_email(&conn.user1).await?;
                Ok::<_, AppError>(Invitation {
                    connection_id: conn.id,
                    from_name: inviter.map(|u| u.name).unwrap_or_default(),
                    from_email: conn.user1,
                    created_at: conn.created_at,
                })
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .try_collect()
            .await
    }

    /// Send an invitation from `inviter` to `target_email` (already normalized).
    pub async fn invite(&self, inviter: &User, target_email: &str) -> Result<Connection, AppError> {
        if target_email == inviter.email {
            return Err(AppError::BadRequest(
                "Cannot connect to yourself".to_string(),
            ));
        }

        if self.db.find_user_by_email(target_email).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        for (user1, user2) in [
            (inviter.email.as_str(), target_email),
            (target_email, inviter.email.as_str()),
        ] {
            if let Some(existing) = self.db.find_connection(user1, user2).await? {
                let msg = match existing.status {
                    ConnectionStatus::Active => "Already connected",
                    ConnectionStatus::Pending => "Invitation already pending",
                };
                return Err(AppError::BadRequest(msg.to_string()));
            }
        }

        let now = Utc::now();
        let connection = Connection {
            id: new_doc_id()?,
            user1: inviter.email.clone(),
            user2: target_email.to_string(),
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.db.put_connection(&connection).await?;

        tracing::info!(
            connection_id = %connection.id,
            from = %connection.user1,
            to = %connection.user2,
            "Connection invitation created"
        );
        Ok(connection)
    }

    /// Accept a pending invitation. Only the invitee may accept.
    pub async fn accept(&self, connection_id: &str, email: &str) -> Result<Connection, AppError> {
        let mut connection = self.load(connection_id).await?;

        if connection.user2 != email {
            return Err(AppError::Forbidden(
                "Only the invited user can accept".to_string(),
            ));
        }
        if connection.status == ConnectionStatus::Active {
            return Err(AppError::BadRequest("Connection already active".to_string()));
        }

        let ddays = self
            .fan_out(&connection, |dday, partner| dday.add_connected_user(partner))
            .await?;

        connection.status = ConnectionStatus::Active;
        connection.updated_at = Utc::now();

        let updated = ddays.len();
        self.db
            .commit_connection_change(&ConnectionChange {
                connection: ConnectionWrite::Upsert(connection.clone()),
                ddays,
            })
            .await?;

        tracing::info!(connection_id, ddays_updated = updated, "Connection accepted");
        Ok(connection)
    }

    /// Reject a pending invitation or end an active connection.
    ///
    /// Either participant may call this.
    pub async fn reject(&self, connection_id: &str, email: &str) -> Result<(), AppError> {
        let connection = self.load(connection_id).await?;

        if !connection.involves(email) {
            return Err(AppError::Forbidden(
                "Not a participant in this connection".to_string(),
            ));
        }

        self.remove(&connection).await
    }

    /// Remove every connection the user takes part in, with fan-out.
    pub async fn remove_all_for_user(&self, email: &str) -> Result<usize, AppError> {
        let mut removed = 0;
        for role in [ConnectionRole::Inviter, ConnectionRole::Invitee] {
            for connection in self.db.list_connections(role, email, None).await? {
                self.remove(&connection).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn load(&self, connection_id: &str) -> Result<Connection, AppError> {
        self.db
            .get_connection(connection_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Connection not found".to_string()))
    }

    async fn remove(&self, connection: &Connection) -> Result<(), AppError> {
        let ddays = self
            .fan_out(connection, |dday, partner| dday.remove_connected_user(partner))
            .await?;

        let updated = ddays.len();
        self.db
            .commit_connection_change(&ConnectionChange {
                connection: ConnectionWrite::Delete(connection.id.clone()),
                ddays,
            })
            .await?;

        tracing::info!(
            connection_id = %connection.id,
            ddays_updated = updated,
            "Connection removed"
        );
        Ok(())
    }

    /// Apply `edit(dday, partner)` to every D-Day created by either
    /// participant, where `partner` is the other participant.
    ///
    /// Returns only the D-Days that changed.
    async fn fan_out<F>(&self, connection: &Connection, edit: F) -> Result<Vec<DDay>, AppError>
    where
        F: Fn(&mut DDay, &str) -> bool,
    {
        let mut changed = Vec::new();
        let now = Utc::now();

        for (creator, partner) in [
            (&connection.user1, &connection.user2),
            (&connection.user2, &connection.user1),
        ] {
            for mut dday in self.db.list_ddays_created_by(creator).await? {
                if edit(&mut dday, partner.as_str()) {
                    dday.updated_at = now;
                    changed.push(dday);
                }
            }
        }
        Ok(changed)
    }
}
