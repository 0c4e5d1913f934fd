// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! External tool hand-off link tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_penora_link_redirects_with_identity() {
    let (app, state) = common::create_test_app();
    let (user, token) = common::register_user(&state, "link@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/penora_link")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
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
    assert!(location.starts_with(state.config.penora_base_url.as_deref().unwrap()));
    assert!(location.contains(&format!("user_id={}", user.id)));
    assert!(location.contains("email=link%40example.com"));
}

#[tokio::test]
async fn test_links_require_auth() {
    let (app, _) = common::create_test_app();

    for uri in ["/penora_link", "/imagegene_link"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
