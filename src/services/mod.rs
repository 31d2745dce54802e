// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod connections;
pub mod ddays;
pub mod google_oauth;
pub mod sessions;

pub use connections::{ConnectionService, Invitation};
pub use ddays::{CreateDDay, DDayService, UpdateDDay};
pub use google_oauth::{GoogleOAuthClient, GoogleProfile, GoogleTokenResponse};
pub use sessions::SessionService;
