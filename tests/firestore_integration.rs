// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`). Without it they return early.

use calple::db::{ConnectionChange, ConnectionWrite, Store};
use calple::models::{AuthToken, Connection, ConnectionRole, ConnectionStatus, DDay, User};
use chrono::{Duration, NaiveDate, Utc};

mod common;
use common::test_db;

/// Unique suffix for test isolation.
fn unique() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

fn test_user(id: &str, email: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: "Test User".to_string(),
        created_at: now,
        last_login_at: now,
        tokens: None,
    }
}

fn test_dday(id: &str, created_by: &str) -> DDay {
    let now = Utc::now();
    DDay {
        id: id.to_string(),
        title: "Anniversary".to_string(),
        description: String::new(),
        date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
        is_annual: true,
        created_by: created_by.to_string(),
        connected_users: vec![],
        group: None,
        end_date: None,
        created_at: now,
        updated_at: now,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_round_trip_and_email_lookup() {
    require_emulator!();

    let db = test_db().await;
    let id = unique();
    let email = format!("{id}@example.com");

    assert!(db.get_user(&id).await.unwrap().is_none());
    db.upsert_user(&test_user(&id, &email)).await.unwrap();

    let fetched = db.get_user(&id).await.unwrap().unwrap();
    assert_eq!(fetched.email, email);
    let by_email = db.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(by_email.id, id);

    db.delete_user(&id).await.unwrap();
    assert!(db.get_user(&id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTH TOKEN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_expired_token_sweep() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique();
    let now = Utc::now();

    let expired = AuthToken {
        id: format!("{user_id}-old"),
        user_id: user_id.clone(),
        created_at: now - Duration::hours(2),
        expires_at: now - Duration::hours(1),
    };
    let live = AuthToken {
        id: format!("{user_id}-new"),
        user_id: user_id.clone(),
        created_at: now,
        expires_at: now + Duration::hours(1),
    };
    db.put_auth_token(&expired).await.unwrap();
    db.put_auth_token(&live).await.unwrap();

    let removed = db.delete_expired_auth_tokens(now).await.unwrap();
    assert!(removed >= 1);
    assert!(db.get_auth_token(&expired.id).await.unwrap().is_none());

    let fetched = db.get_auth_token(&live.id).await.unwrap().unwrap();
    assert_eq!(fetched.expires_at.timestamp(), live.expires_at.timestamp());

    assert_eq!(db.delete_auth_tokens_for_user(&user_id).await.unwrap(), 1);
    assert!(db.get_auth_token(&live.id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// D-DAY AND CONNECTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_dday_queries() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique();
    let creator = format!("creator-{suffix}@example.com");
    let partner = format!("partner-{suffix}@example.com");

    let mut dday = test_dday(&format!("dday-{suffix}"), &creator);
    dday.connected_users = vec![partner.clone()];
    dday.end_date = NaiveDate::from_ymd_opt(2024, 5, 16);
    db.put_dday(&dday).await.unwrap();

    let created = db.list_ddays_created_by(&creator).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].date, dday.date);
    assert_eq!(created[0].end_date, dday.end_date);
    assert!(created[0].is_annual);

    let shared = db.list_ddays_shared_with(&partner).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, dday.id);

    db.delete_dday(&dday.id).await.unwrap();
    assert!(db.get_dday(&dday.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_connection_change_commits_ddays_and_connection() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique();
    let user1 = format!("u1-{suffix}@example.com");
    let user2 = format!("u2-{suffix}@example.com");
    let now = Utc::now();

    let mut connection = Connection {
        id: format!("conn-{suffix}"),
        user1: user1.clone(),
        user2: user2.clone(),
        status: ConnectionStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    db.put_connection(&connection).await.unwrap();

    let found = db.find_connection(&user1, &user2).await.unwrap().unwrap();
    assert_eq!(found.id, connection.id);
    assert!(db.find_connection(&user2, &user1).await.unwrap().is_none());

    let pending = db
        .list_connections(ConnectionRole::Invitee, &user2, Some(ConnectionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let mut dday = test_dday(&format!("dday-{suffix}"), &user1);
    db.put_dday(&dday).await.unwrap();

    dday.connected_users.push(user2.clone());
    connection.status = ConnectionStatus::Active;
    db.commit_connection_change(&ConnectionChange {
        connection: ConnectionWrite::Upsert(connection.clone()),
        ddays: vec![dday.clone()],
    })
    .await
    .unwrap();

    let active = db
        .list_connections(ConnectionRole::Inviter, &user1, Some(ConnectionStatus::Active))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    let stored = db.get_dday(&dday.id).await.unwrap().unwrap();
    assert_eq!(stored.connected_users, vec![user2.clone()]);

    dday.connected_users.clear();
    db.commit_connection_change(&ConnectionChange {
        connection: ConnectionWrite::Delete(connection.id.clone()),
        ddays: vec![dday.clone()],
    })
    .await
    .unwrap();

    assert!(db.get_connection(&connection.id).await.unwrap().is_none());
    let stored = db.get_dday(&dday.id).await.unwrap().unwrap();
    assert!(stored.connected_users.is_empty());

    db.delete_dday(&dday.id).await.unwrap();
}
