// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pairwise connection between two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection status. A rejected or disconnected pair has no document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Active,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Active => "active",
        }
    }
}

/// Which side of a connection a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// `user1`, who sent the invitation
    Inviter,
    /// `user2`, who received it
    Invitee,
}

impl ConnectionRole {
    /// Document field holding this participant's email.
    pub fn field(&self) -> &'static str {
        match self {
            ConnectionRole::Inviter => "user1",
            ConnectionRole::Invitee => "user2",
        }
    }
}

/// Connection document in the `connections` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    /// Inviter email
    pub user1: String,
    /// Invitee email
    pub user2: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn involves(&self, email: &str) -> bool {
        self.user1 == email || self.user2 == email
    }

    /// The other participant, if `email` is one of the two.
    pub fn partner_of(&self, email: &str) -> Option<&str> {
        if self.user1 == email {
            Some(&self.user2)
        } else if self.user2 == email {
            Some(&self.user1)
        } else {
            None
        }
    }
}
