//! Integration tests for authentication endpoints

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_success() {
    let app = common::TestApp::new().await;

    let email = format!("register_test_{}@example.com", uuid::Uuid::new_v4().simple());
    let body = json!({
        "email": email,
        "username": format!("reg_{}", &uuid::Uuid::new_v4().simple().to_string()[..10]),
        "password": common::TEST_PASSWORD,
        "full_name": "Register Test",
    });

    let (status, response) = app.post("/api/v1/auth/register", &body.to_string()).await;

    assert_eq!(status, StatusCode::CREATED);

    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["email"], email);
    assert_eq!(response["full_name"], "Register Test");
    assert_eq!(response["is_active"], true);
    assert_eq!(response["is_superuser"], false);
    assert!(response.get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_email() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let body = json!({
        "email": user.email,
        "username": format!("dup_{}", &uuid::Uuid::new_v4().simple().to_string()[..10]),
        "password": common::TEST_PASSWORD,
    });

    let (status, response) = app.post("/api/v1/auth/register", &body.to_string()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(response.contains("Email already registered"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_invalid_email() {
    let app = common::TestApp::new().await;

    let body = json!({
        "email": "not-an-email",
        "username": "invalid_email_user",
        "password": common::TEST_PASSWORD,
    });

    let (status, _) = app.post("/api/v1/auth/register", &body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_register_weak_password() {
    let app = common::TestApp::new().await;

    let body = json!({
        "email": "weak_password@example.com",
        "username": "weak_password",
        "password": "123",
    });

    let (status, _) = app.post("/api/v1/auth/register", &body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_wrong_password() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let (status, _) = app.login(&user.email, "WrongPassword123!").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_login_nonexistent_user() {
    let app = common::TestApp::new().await;

    let (status, _) = app.login("nonexistent@example.com", "SomePassword123!").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_refresh_rotates_tokens() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let body = json!({ "refresh_token": user.refresh_token }).to_string();
    let (status, response) = app.post("/api/v1/auth/refresh", &body).await;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_str(&response).unwrap();
    assert_ne!(response["refresh_token"], user.refresh_token.as_str());

    // The presented token was consumed
    let (status, _) = app.post("/api/v1/auth/refresh", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_logout_revokes_refresh_token() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let body = json!({ "refresh_token": user.refresh_token }).to_string();
    let (status, response) = app.post("/api/v1/auth/logout", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("Successfully logged out"));

    let (status, _) = app.post("/api/v1/auth/refresh", &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access tokens outlive logout until they expire
    let (status, _) = app
        .get_authed("/api/v1/auth/me", Some(&user.access_token))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_logout_all_revokes_every_session() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let (status, second) = app.login(&user.email, common::TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    let second: Value = serde_json::from_str(&second).unwrap();

    let (status, _) = app
        .post_authed("/api/v1/auth/logout-all", "{}", Some(&user.access_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    for refresh_token in [user.refresh_token.as_str(), second["refresh_token"].as_str().unwrap()] {
        let body = json!({ "refresh_token": refresh_token }).to_string();
        let (status, _) = app.post("/api/v1/auth/refresh", &body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_me_and_profile_update() {
    let app = common::TestApp::new().await;
    let user = app.create_test_user().await;

    let (status, me) = app
        .get_authed("/api/v1/users/me", Some(&user.access_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let me: Value = serde_json::from_str(&me).unwrap();
    assert_eq!(me["id"], user.id.as_str());

    let other = app.create_test_user().await;
    let (status, _) = app
        .get_authed(&format!("/api/v1/users/{}", other.id), Some(&user.access_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
