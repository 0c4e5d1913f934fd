// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use http_body_util::BodyExt;
use std::sync::Arc;

use sukusuku_api::config::Config;
use sukusuku_api::db::{MemoryStorage, Storage};
use sukusuku_api::models::User;
use sukusuku_api::routes::create_router;
use sukusuku_api::AppState;

/// Create a test app over in-memory storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let state = Arc::new(AppState::new(config, storage));
    (create_router(state.clone()), state)
}

/// Register a password account directly through the service layer.
/// Returns the user and a valid session token.
#[allow(dead_code)]
pub async fn register_user(state: &AppState, email: &str) -> (User, String) {
    state
        .auth
        .register(
            email.to_string(),
            "Test".to_string(),
            "User".to_string(),
            "password123",
        )
        .await
        .expect("registration failed")
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not valid JSON")
}
