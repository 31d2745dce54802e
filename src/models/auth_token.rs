// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Opaque bearer tokens issued after sign-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session token stored in the `auth_tokens` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Random hex string (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    #[serde(with = "crate::time_utils::rfc3339_secs")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::rfc3339_secs")]
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
