// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin login and stats tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn admin_token(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/admin/login",
            json!({ "password": "test_admin_password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_login_wrong_password() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/admin/login",
            json!({ "password": "guess" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats_requires_admin_token() {
    let (app, state) = common::create_test_app();

    // No credentials at all.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A regular user's session token is not an admin credential.
    let (_, user_token) = common::register_user(&state, "user@example.com").await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/stats")
                .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats_reports_users() {
    let (app, state) = common::create_test_app();
    common::register_user(&state, "one@example.com").await;
    common::register_user(&state, "two@example.com").await;

    let token = admin_token(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/stats")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["new_users_24h"], 2);
    assert_eq!(body["total_credits_used"], 0);
    assert_eq!(body["recent_users"].as_array().unwrap().len(), 2);
}
