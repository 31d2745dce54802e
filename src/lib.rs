// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calple: shared D-Day calendar backend.
//!
//! Google sign-in, D-Days (dated milestones, optionally annual), and
//! pairwise connections that share each partner's D-Days with the other.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use services::{ConnectionService, DDayService, GoogleOAuthClient, SessionService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub sessions: SessionService,
    pub google: GoogleOAuthClient,
    pub connections: ConnectionService,
    pub ddays: DDayService,
}

impl AppState {
    /// Wire services over `db`.
    pub fn new(config: Config, db: Db) -> Self {
        let sessions = SessionService::new(db.clone(), config.auth_token_ttl_hours);
        let google = GoogleOAuthClient::new(&config);
        let connections = ConnectionService::new(db.clone());
        let ddays = DDayService::new(db.clone(), connections.clone());

        Self {
            config,
            db,
            sessions,
            google,
            connections,
            ddays,
        }
    }
}
