// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin panel routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::AdminStats;
use crate::error::{AppError, Result};
use crate::middleware::admin::issue_admin_token;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/login", post(admin_login))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/stats", get(admin_stats))
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
}

/// POST /api/admin/login - exchange the shared password for a bearer token.
async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>> {
    let expected = state
        .config
        .admin_password
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Admin access is not configured".to_string()))?;

    if payload.password != expected {
        tracing::warn!("Failed admin login attempt");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_admin_token(&state.config.jwt_secret)?;
    tracing::info!("Admin logged in");
    Ok(Json(AdminLoginResponse { token }))
}

/// GET /api/admin/stats
async fn admin_stats(State(state): State<Arc<AppState>>) -> Result<Json<AdminStats>> {
    let stats = state.storage.admin_stats(Utc::now()).await?;
    Ok(Json(stats))
}
