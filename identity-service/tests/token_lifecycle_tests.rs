mod common;

use chrono::Duration;
use common::TestApp;
use common::PASSWORD;
use identity_service::account::models::UserId;
use identity_service::account::tokens::TokenLifetimes;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_old_token() {
    let app = TestApp::spawn().await;
    let registered = app.register("nicola@example.com").await;
    let original = registered["refresh_token"].as_str().unwrap();

    let (status, body) = app.refresh(original).await;
    assert_eq!(status, StatusCode::OK);

    let rotated = body["data"]["refresh_token"].as_str().unwrap();
    assert_ne!(rotated, original);

    let (replay, _) = app.refresh(original).await;
    assert_eq!(replay, StatusCode::UNAUTHORIZED);

    let (next, _) = app.refresh(rotated).await;
    assert_eq!(next, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_single_winner() {
    let app = TestApp::spawn().await;
    let registered = app.register("nicola@example.com").await;
    let token = registered["refresh_token"].as_str().unwrap().to_string();
    let user_id = UserId::from_string(registered["user"]["id"].as_str().unwrap()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let request = app
                .post("/auth/refresh-token")
                .json(&json!({ "refresh_token": token }));
            tokio::spawn(async move { request.send().await.map(|r| r.status()) })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        let status = handle
            .await
            .expect("Refresh task panicked")
            .expect("Failed to execute request");
        statuses.push(status);
    }

    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losers = statuses
        .iter()
        .filter(|s| **s == StatusCode::UNAUTHORIZED)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(losers, 7);

    // Registration token plus exactly one replacement
    assert_eq!(app.store.refresh_tokens_of(&user_id).await.len(), 2);
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected() {
    let app = TestApp::spawn_with(TokenLifetimes {
        refresh_token: Duration::seconds(-1),
        ..TokenLifetimes::default()
    })
    .await;
    let registered = app.register("nicola@example.com").await;

    let (status, _) = app
        .refresh(registered["refresh_token"].as_str().unwrap())
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_verification_token_stays_unused() {
    let app = TestApp::spawn_with(TokenLifetimes {
        email_verification: Duration::seconds(-1),
        ..TokenLifetimes::default()
    })
    .await;
    let registered = app.register("nicola@example.com").await;
    let token = app.email_verification_token().await;

    let (status, body) = app
        .post_json("/auth/verify-email", json!({ "token": token }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("expired"));

    let access_token = registered["access_token"].as_str().unwrap();
    let profile: serde_json::Value = app
        .get_authenticated("/users/me", access_token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(profile["data"]["email_verified"], false);
}

#[tokio::test]
async fn test_verification_marks_user_verified() {
    let app = TestApp::spawn().await;
    let registered = app.register("nicola@example.com").await;
    let token = app.email_verification_token().await;

    let (status, _) = app
        .post_json("/auth/verify-email", json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let access_token = registered["access_token"].as_str().unwrap();
    let profile: serde_json::Value = app
        .get_authenticated("/users/me", access_token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(profile["data"]["email_verified"], true);
}

#[tokio::test]
async fn test_reset_password_swaps_credentials_and_revokes_sessions() {
    let app = TestApp::spawn().await;
    let registered = app.register("nicola@example.com").await;
    app.email_verification_token().await;

    let (_, login) = app.login("nicola@example.com", PASSWORD).await;
    let sessions = [
        registered["refresh_token"].as_str().unwrap().to_string(),
        login["data"]["refresh_token"].as_str().unwrap().to_string(),
    ];

    app.post_json(
        "/auth/forgot-password",
        json!({ "email": "nicola@example.com" }),
    )
    .await;
    let reset_token = app.password_reset_token().await;

    let (status, body) = app
        .post_json(
            "/auth/reset-password",
            json!({ "token": reset_token, "new_password": "New_Password!" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    for session in &sessions {
        let (status, _) = app.refresh(session).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (old, _) = app.login("nicola@example.com", PASSWORD).await;
    let (new, _) = app.login("nicola@example.com", "New_Password!").await;
    assert_eq!(old, StatusCode::UNAUTHORIZED);
    assert_eq!(new, StatusCode::OK);

    let (reuse, _) = app
        .post_json(
            "/auth/reset-password",
            json!({ "token": reset_token, "new_password": "Other_Password!" }),
        )
        .await;
    assert_eq!(reuse, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_reset_token_keeps_old_password() {
    let app = TestApp::spawn_with(TokenLifetimes {
        password_reset: Duration::seconds(-1),
        ..TokenLifetimes::default()
    })
    .await;
    app.register("nicola@example.com").await;
    app.email_verification_token().await;

    app.post_json(
        "/auth/forgot-password",
        json!({ "email": "nicola@example.com" }),
    )
    .await;
    let reset_token = app.password_reset_token().await;

    let (status, _) = app
        .post_json(
            "/auth/reset-password",
            json!({ "token": reset_token, "new_password": "New_Password!" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (login, _) = app.login("nicola@example.com", PASSWORD).await;
    assert_eq!(login, StatusCode::OK);
}
