// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Embed-token minting tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use sukusuku_api::services::tokens::decode_embed_token;

mod common;

#[tokio::test]
async fn test_embed_token_carries_profile_snapshot() {
    let (app, state) = common::create_test_app();
    let (user, session_token) = common::register_user(&state, "embed@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/token")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["expires_in"], 3600);

    let claims = decode_embed_token(
        body["token"].as_str().unwrap(),
        &state.config.jwt_secret,
    )
    .unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, "embed@example.com");
    assert_eq!(claims.app_name, "general");
    assert_eq!(claims.penora_credits, 100);
    assert_eq!(claims.imagegene_credits, 50);
}

#[tokio::test]
async fn test_app_token_is_scoped_and_frozen_at_mint() {
    let (app, state) = common::create_test_app();
    let (user, session_token) = common::register_user(&state, "scoped@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/app-token/penora")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;

    // Spend credits after minting: the already-issued token must still
    // carry the balances as of mint time.
    state
        .storage
        .update_user_credits(&user.id, Some(1), Some(1), 0)
        .await
        .unwrap();

    let claims = decode_embed_token(
        body["token"].as_str().unwrap(),
        &state.config.jwt_secret,
    )
    .unwrap();
    assert_eq!(claims.app_name, "penora");
    assert_eq!(claims.penora_credits, 100);
    assert_eq!(claims.imagegene_credits, 50);
}

#[tokio::test]
async fn test_app_token_rejects_unknown_app() {
    let (app, state) = common::create_test_app();
    let (_, session_token) = common::register_user(&state, "unknown@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/app-token/megatool")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_embed_token_requires_auth() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_embed_token_cannot_authenticate_api_calls() {
    let (app, state) = common::create_test_app();
    let (user, _) = common::register_user(&state, "misuse@example.com").await;

    // Mint an embed token directly and try to use it as a session token.
    let embed = state.tokens.issue_embed_token(&user, "general").await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/user")
                .header(header::AUTHORIZATION, format!("Bearer {}", embed))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
