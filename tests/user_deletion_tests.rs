// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account deletion tests.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{
    api_request, body_json, create_test_app, find_cookie, seed_dday, seed_session,
    set_cookie_headers,
};

const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";

#[tokio::test]
async fn test_delete_account_removes_everything() {
    let (app, state) = create_test_app();
    let alice = seed_session(&state, "a", ALICE).await;
    let bob = seed_session(&state, "b", BOB).await;
    let second_alice = state.sessions.issue("a").await.unwrap().id;

    let created = body_json(
        app.clone()
            .oneshot(api_request(
                Method::POST,
                "/api/connection/invite",
                Some(&alice),
                Some(json!({ "email": BOB })),
            ))
            .await
            .unwrap(),
    )
    .await;
    let connection_id = created["connectionId"].as_str().unwrap().to_string();
    app.clone()
        .oneshot(api_request(
            Method::POST,
            &format!("/api/connection/{connection_id}/accept"),
            Some(&bob),
            None,
        ))
        .await
        .unwrap();

    seed_dday(&state, "a1", ALICE, &[]).await;
    seed_dday(&state, "b1", BOB, &[ALICE]).await;

    let response = app
        .clone()
        .oneshot(api_request(Method::DELETE, "/api/user", Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = find_cookie(&set_cookie_headers(&response), "calple_token");
    assert!(cookie.contains("Max-Age=0"));

    assert!(state.db.get_user("a").await.unwrap().is_none());
    assert!(state.db.get_auth_token(&alice).await.unwrap().is_none());
    assert!(state.db.get_auth_token(&second_alice).await.unwrap().is_none());
    assert!(state.db.get_connection(&connection_id).await.unwrap().is_none());
    assert!(state.db.get_dday("a1").await.unwrap().is_none());

    // Bob keeps his D-Day, without Alice on it
    let b1 = state.db.get_dday("b1").await.unwrap().unwrap();
    assert!(b1.connected_users.is_empty());

    let response = app
        .oneshot(api_request(Method::GET, "/api/connection", Some(&bob), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["connected"], false);
}

#[tokio::test]
async fn test_delete_account_clears_pending_invitations() {
    let (app, state) = create_test_app();
    let alice = seed_session(&state, "a", ALICE).await;
    let bob = seed_session(&state, "b", BOB).await;

    app.clone()
        .oneshot(api_request(
            Method::POST,
            "/api/connection/invite",
            Some(&alice),
            Some(json!({ "email": BOB })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(api_request(Method::DELETE, "/api/user", Some(&alice), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(api_request(Method::GET, "/api/connection/pending", Some(&bob), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["invitations"], json!([]));
}
