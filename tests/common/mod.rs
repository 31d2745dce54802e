// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use calple::config::Config;
use calple::db::{Db, FirestoreDb, MemoryDb};
use calple::models::{DDay, User};
use calple::routes::create_router;
use calple::AppState;
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app on an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db: Db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()), state)
}

/// Store a user with the given id and email.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, id: &str, email: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: id.to_string(),
        email: email.to_string(),
        name: format!("User {id}"),
        created_at: now,
        last_login_at: now,
        tokens: None,
    };
    state.db.upsert_user(&user).await.unwrap();
    user
}

/// Seed a user and issue a session token for them.
#[allow(dead_code)]
pub async fn seed_session(state: &AppState, id: &str, email: &str) -> String {
    seed_user(state, id, email).await;
    state.sessions.issue(id).await.unwrap().id
}

/// Store a D-Day directly, bypassing the API.
#[allow(dead_code)]
pub async fn seed_dday(state: &AppState, id: &str, created_by: &str, connected: &[&str]) -> DDay {
    let now = Utc::now();
    let dday = DDay {
        id: id.to_string(),
        title: format!("Event {id}"),
        description: String::new(),
        date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
        is_annual: false,
        created_by: created_by.to_string(),
        connected_users: connected.iter().map(|s| s.to_string()).collect(),
        group: None,
        end_date: None,
        created_at: now,
        updated_at: now,
    };
    state.db.put_dday(&dday).await.unwrap();
    dday
}

/// Build a request carrying a bearer token and optional JSON body.
#[allow(dead_code)]
pub fn api_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}
