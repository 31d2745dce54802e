// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod auth_token;
pub mod connection;
pub mod dday;
pub mod user;

pub use auth_token::AuthToken;
pub use connection::{Connection, ConnectionRole, ConnectionStatus};
pub use dday::{DDay, MonthView};
pub use user::{GoogleTokens, User, UserProfile};
