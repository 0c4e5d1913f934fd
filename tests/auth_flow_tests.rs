// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end auth flow tests: registration, login, logout and the
//! password/OAuth provider split.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_register_sets_cookie_and_returns_user() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/register",
            json!({
                "email": "new@example.com",
                "password": "password123",
                "confirm_password": "password123",
                "first_name": "New",
                "last_name": "User"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("no auth cookie set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = common::body_json(response).await;
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["penora_credits"], 100);
    assert_eq!(body["user"]["imagegene_credits"], 50);
    // The password hash must never appear on the wire.
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let (app, state) = common::create_test_app();
    common::register_user(&state, "taken@example.com").await;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/register",
            json!({
                "email": "taken@example.com",
                "password": "password123",
                "confirm_password": "password123",
                "first_name": "Other",
                "last_name": "User"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "duplicate_email");
}

#[tokio::test]
async fn test_register_validates_input() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/register",
            json!({
                "email": "not-an-email",
                "password": "short",
                "confirm_password": "different",
                "first_name": "",
                "last_name": ""
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let (app, state) = common::create_test_app();
    common::register_user(&state, "login@example.com").await;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "login@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_login_oauth_account_reports_provider_mismatch() {
    let (app, state) = common::create_test_app();

    state
        .storage
        .upsert_oauth_user(sukusuku_api::models::OauthProfile {
            provider_id: "google-123".to_string(),
            email: "oauth@example.com".to_string(),
            first_name: Some("O".to_string()),
            last_name: Some("Auth".to_string()),
            profile_image_url: None,
        })
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "oauth@example.com", "password": "anything123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "provider_mismatch");
    assert_eq!(
        body["details"],
        "Please use Google sign-in for this account"
    );
}

#[tokio::test]
async fn test_current_user_with_bearer_token() {
    let (app, state) = common::create_test_app();
    let (user, token) = common::register_user(&state, "me@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/user")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["user"]["id"], user.id);
}

#[tokio::test]
async fn test_current_user_with_cookie() {
    let (app, state) = common::create_test_app();
    let (_, token) = common::register_user(&state, "cookie@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/user")
                .header(header::COOKIE, format!("auth_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_without_credentials() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_session_token() {
    let (app, state) = common::create_test_app();
    let (_, token) = common::register_user(&state, "bye@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, format!("auth_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The token is gone from the store: even with a valid signature, the
    // bearer path must now fail.
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/user")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_start_redirects_to_google() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/google")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn test_google_callback_error_redirects_to_frontend() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/google/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with(&state.config.frontend_url));
    assert!(location.contains("error=access_denied"));
}
